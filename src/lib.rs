// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Relewise clients
//!
//! `relewise_clients` resolves the connection options (dataset id, api key,
//! timeout and server url) of Relewise clients and registers one client per
//! capability, either as the default client or under a name.
//!
//! Options are layered: a named client's kind-specific options override the
//! named client's global options, which override the default client of the
//! same kind, which overrides the top-level global options. Every level is
//! a partial [`options::ClientOptionsBuilder`]; a level resolves only when a
//! dataset id and an api key are available.
//!
//! This crate contains the library behind the `relewise` CLI, but its
//! modules can be used on their own.
//!
//! ## Core Modules
//!
//! * [`options`]: Partial option builders, the merge algorithm and the
//!   top-level [`options::RelewiseOptionsBuilder`] tree.
//! * [`source`]: Reads a configuration section (JSON, TOML, env) into the tree
//!   and produces example sections.
//! * [`registration`]: Collects configuration callbacks and builds the registry.
//! * [`registry`]: Resolves every client eagerly and hands them out by kind
//!   and name.
//! * [`client`]: The [`client::Client`] trait, its capability traits and the
//!   default client types.
//! * [`kind`]: The [`kind::ClientKind`] enum and registry keys.
//! * [`duration`]: Parsing and formatting of timeouts.
//! * [`cli`]: Defines the `clap`-based command-line interface.
//! * [`error`]: Defines the custom error types for the library.
//! * [`logging`]: Provides the `setup_tracing` utility.

pub mod cli;
pub mod client;
pub mod duration;
pub mod error;
pub mod kind;
pub mod logging;
pub mod options;
pub mod registration;
pub mod registry;
pub mod source;

pub use error::RelewiseError;
pub use error::Result;
pub use kind::ClientKind;
pub use options::ClientOptions;
pub use options::RelewiseOptionsBuilder;
pub use registration::Registration;
pub use registry::ClientRegistry;

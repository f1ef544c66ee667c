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
use crate::kind::ClientKind;
use crate::source::DEFAULT_SECTION;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Inspect resolved Relewise client configuration")]
pub struct Cli {
  /// JSON or TOML file holding the Relewise section.
  /// Environment variables such as RELEWISE__APIKEY are always read as well.
  #[arg(long, short, global = true, env = "RELEWISE_CONFIG")]
  pub config: Option<PathBuf>,

  /// Name of the configuration section, nested sections separated by ':'.
  #[arg(long, global = true, default_value = DEFAULT_SECTION)]
  pub section: String,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Print the resolved options of one client as JSON.
  Options {
    /// Client kind, e.g. tracker or search-administrator.
    #[arg(long)]
    kind: ClientKind,

    /// Named client; the default client when omitted.
    #[arg(long)]
    name: Option<String>,

    /// Print the api key instead of a masked version.
    #[arg(long)]
    reveal_api_key: bool,
  },

  /// List the named clients, one per line.
  Names,

  /// Resolve every client and report what was registered.
  Check,

  /// Print an example configuration section.
  Example {
    #[arg(long, value_enum, default_value_t = ExampleFormat::Json)]
    format: ExampleFormat,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExampleFormat {
  Json,
  Toml,
}

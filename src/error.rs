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
use crate::kind::ClientKey;
use crate::kind::ClientKind;
use std::fmt;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = RelewiseError> = std::result::Result<T, E>;

/// Top-level error enum for the relewise-clients library.
#[derive(Error, Debug)]
pub enum RelewiseError {
  #[error("Invalid configuration: {0}")]
  InvalidConfiguration(#[from] ConfigError),

  /// `kind` is `None` when a named client was asked for as a whole.
  #[error("{reason}: no {} was registered during startup", describe_client(.name, .kind))]
  NotRegistered {
    name: Option<String>,
    kind: Option<ClientKind>,
    reason: NotRegisteredReason,
  },

  #[error("A client named '{name}' was already registered")]
  DuplicateName { name: String },

  #[error("Invalid usage: {message}")]
  InvalidUsage { message: String },
}

impl RelewiseError {
  pub(crate) fn not_registered(key: ClientKey, reason: NotRegisteredReason) -> Self {
    RelewiseError::NotRegistered {
      name: key.name,
      kind: Some(key.kind),
      reason,
    }
  }

  pub(crate) fn unknown_name(name: impl Into<String>) -> Self {
    RelewiseError::NotRegistered {
      name: Some(name.into()),
      kind: None,
      reason: NotRegisteredReason::UnknownName,
    }
  }

  pub fn is_invalid_configuration(&self) -> bool {
    matches!(self, RelewiseError::InvalidConfiguration(_))
  }

  pub fn is_not_registered(&self) -> bool {
    matches!(self, RelewiseError::NotRegistered { .. })
  }

  pub fn is_duplicate_name(&self) -> bool {
    matches!(self, RelewiseError::DuplicateName { .. })
  }

  pub fn is_invalid_usage(&self) -> bool {
    matches!(self, RelewiseError::InvalidUsage { .. })
  }
}

fn describe_client(name: &Option<String>, kind: &Option<ClientKind>) -> String {
  match (name, kind) {
    (Some(name), Some(kind)) => ClientKey::named(name.as_str(), *kind).to_string(),
    (None, Some(kind)) => ClientKey::default_client(*kind).to_string(),
    (Some(name), None) => format!("client named '{name}'"),
    (None, None) => "client".to_string(),
  }
}

/// Why a lookup found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotRegisteredReason {
  /// No named client with the requested name was declared.
  UnknownName,
  /// The client kind was never configured (no dataset id anywhere in its chain).
  NotConfigured,
}

impl fmt::Display for NotRegisteredReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NotRegisteredReason::UnknownName => f.write_str("Unknown client name"),
      NotRegisteredReason::NotConfigured => f.write_str("Client not configured"),
    }
  }
}

/// Details of an invalid configuration (src/options.rs, src/source.rs).
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("{key}: {source}")]
  Client {
    key: ClientKey,
    #[source]
    source: Box<ConfigError>,
  },

  #[error(
    "Value for 'DatasetId' is required. The correct value can be found using https://my.relewise.com."
  )]
  MissingDatasetId,

  #[error(
    "Value for 'DatasetId' cannot be an empty Guid. The correct value can be found using https://my.relewise.com."
  )]
  EmptyDatasetId,

  #[error(
    "Value for 'ApiKey' cannot be null or empty. The correct value can be found using https://my.relewise.com."
  )]
  MissingApiKey,

  #[error("Value for 'Timeout' must be greater than zero, got {value}")]
  NonPositiveTimeout { value: String },

  #[error("Value for 'Timeout' could not be parsed: '{value}'")]
  InvalidTimeout { value: String },

  #[error("Value for 'ServerUrl' must be a valid absolute uri, got '{url}' ({reason})")]
  InvalidServerUrl { url: String, reason: String },

  #[error("Client name cannot be null or empty")]
  BlankClientName,

  #[error("The specified section '{section}' was not found.{example}")]
  SectionNotFound { section: String, example: String },

  #[error("Could not read Relewise configuration. Expected section: '{section}'.{example}")]
  ReadSection {
    section: String,
    example: String,
    #[source]
    source: Box<figment::Error>,
  },
}

impl ConfigError {
  /// Attaches the `(name, kind)` the error belongs to.
  pub fn for_client(self, key: ClientKey) -> Self {
    ConfigError::Client {
      key,
      source: Box::new(self),
    }
  }

  /// The innermost error, skipping `(name, kind)` context.
  pub fn root(&self) -> &ConfigError {
    match self {
      ConfigError::Client { source, .. } => source.root(),
      other => other,
    }
  }
}

/// Returned when a string does not name a client kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
  "Unknown client kind '{0}'. Expected one of: tracker, recommender, searcher, data-accessor, search-administrator, analyzer"
)]
pub struct ParseClientKindError(pub String);

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

//! Client options and the builders they are resolved from.
//!
//! Options are layered. For a client kind `K` the more specific level wins,
//! field by field:
//!
//! 1. `named[name].K`
//! 2. `named[name].global`
//! 3. `K`
//! 4. `global`
//!
//! The default (unnamed) client of kind `K` only uses levels 3 and 4.

use crate::duration::format_timeout;
use crate::error::ConfigError;
use crate::error::NotRegisteredReason;
use crate::error::RelewiseError;
use crate::kind::ClientKey;
use crate::kind::ClientKind;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::ops::DerefMut;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Timeout used when no level of the configuration sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fully validated options for a single client.
///
/// The only way to get one is [`ClientOptions::new`], which checks every field,
/// so an instance is always valid.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClientOptions {
  dataset_id: Uuid,
  api_key: String,
  timeout: Duration,
  server_url: Option<Url>,
}

impl ClientOptions {
  /// Validates and creates client options.
  ///
  /// * `dataset_id` cannot be the nil uuid.
  /// * `api_key` cannot be empty or whitespace.
  /// * `timeout` must be greater than zero.
  /// * `server_url`, when given, must be a well-formed absolute url.
  pub fn new(
    dataset_id: Uuid,
    api_key: impl Into<String>,
    timeout: Duration,
    server_url: Option<&str>,
  ) -> Result<Self, ConfigError> {
    if dataset_id.is_nil() {
      return Err(ConfigError::EmptyDatasetId);
    }

    let api_key = api_key.into();
    if api_key.trim().is_empty() {
      return Err(ConfigError::MissingApiKey);
    }

    if timeout.is_zero() {
      return Err(ConfigError::NonPositiveTimeout {
        value: format_timeout(timeout),
      });
    }

    let server_url = server_url.map(parse_server_url).transpose()?;

    Ok(ClientOptions {
      dataset_id,
      api_key,
      timeout,
      server_url,
    })
  }

  pub fn dataset_id(&self) -> Uuid {
    self.dataset_id
  }

  pub fn api_key(&self) -> &str {
    &self.api_key
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }

  /// The server to target, or `None` to use the client's built-in default.
  pub fn server_url(&self) -> Option<&Url> {
    self.server_url.as_ref()
  }
}

impl fmt::Debug for ClientOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ClientOptions")
      .field("dataset_id", &self.dataset_id)
      .field("api_key", &"<redacted>")
      .field("timeout", &self.timeout)
      .field("server_url", &self.server_url.as_ref().map(Url::as_str))
      .finish()
  }
}

fn parse_server_url(raw: &str) -> Result<Url, ConfigError> {
  let invalid = |reason: &str| ConfigError::InvalidServerUrl {
    url: raw.to_string(),
    reason: reason.to_string(),
  };

  // `Url::parse` silently strips and escapes these, accepting input that was never well-formed.
  if raw.is_empty() || raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
    return Err(invalid("contains whitespace or control characters"));
  }

  let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

  if url.cannot_be_a_base() || !url.has_host() {
    return Err(invalid("missing host"));
  }

  Ok(url)
}

/// Draft options for one client. Unset fields inherit from the parent level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptionsBuilder {
  pub dataset_id: Option<Uuid>,
  pub api_key: Option<String>,
  pub timeout: Option<Duration>,
  pub server_url: Option<String>,
}

impl ClientOptionsBuilder {
  pub fn is_empty(&self) -> bool {
    self == &ClientOptionsBuilder::default()
  }

  /// Resolves this draft on top of `parent`.
  ///
  /// Returns `Ok(None)` when neither this draft nor a parent provides a dataset
  /// id: the client was simply never configured.
  pub fn build(&self, parent: Option<&ClientOptions>) -> Result<Option<ClientOptions>, ConfigError> {
    if self.dataset_id.is_none() && parent.is_none() {
      return Ok(None);
    }

    let dataset_id = self
      .dataset_id
      .or_else(|| parent.map(ClientOptions::dataset_id))
      .unwrap_or(Uuid::nil());
    if dataset_id.is_nil() {
      return Err(ConfigError::EmptyDatasetId);
    }

    let api_key = match self.api_key.as_deref().or_else(|| parent.map(ClientOptions::api_key)) {
      Some(api_key) if !api_key.trim().is_empty() => api_key,
      _ => return Err(ConfigError::MissingApiKey),
    };

    let timeout = self
      .timeout
      .or_else(|| parent.map(ClientOptions::timeout))
      .unwrap_or(DEFAULT_TIMEOUT);

    let server_url = self
      .server_url
      .as_deref()
      .or_else(|| parent.and_then(|p| p.server_url()).map(Url::as_str));

    ClientOptions::new(dataset_id, api_key, timeout, server_url).map(Some)
  }

  /// Copies every field that is set in `other` onto `self`.
  pub fn overlay(&mut self, other: &ClientOptionsBuilder) {
    if let Some(dataset_id) = other.dataset_id {
      self.dataset_id = Some(dataset_id);
    }
    if let Some(api_key) = &other.api_key {
      self.api_key = Some(api_key.clone());
    }
    if let Some(timeout) = other.timeout {
      self.timeout = Some(timeout);
    }
    if let Some(server_url) = &other.server_url {
      self.server_url = Some(server_url.clone());
    }
  }

  /// Seeds every field from already resolved options.
  pub fn initialize(&mut self, options: &ClientOptions) {
    self.dataset_id = Some(options.dataset_id());
    self.api_key = Some(options.api_key().to_string());
    self.timeout = Some(options.timeout());
    self.server_url = options.server_url().map(|url| url.to_string());
  }
}

/// A global draft plus one draft per client kind.
///
/// Used both for the top level of the configuration and for every named client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientsOptionsBuilder {
  /// Fallback for every kind at this level.
  pub global: ClientOptionsBuilder,
  pub tracker: ClientOptionsBuilder,
  pub recommender: ClientOptionsBuilder,
  pub searcher: ClientOptionsBuilder,
  pub data_accessor: ClientOptionsBuilder,
  pub search_administrator: ClientOptionsBuilder,
  pub analyzer: ClientOptionsBuilder,
}

impl ClientsOptionsBuilder {
  pub fn kind(&self, kind: ClientKind) -> &ClientOptionsBuilder {
    match kind {
      ClientKind::Tracker => &self.tracker,
      ClientKind::Recommender => &self.recommender,
      ClientKind::Searcher => &self.searcher,
      ClientKind::DataAccessor => &self.data_accessor,
      ClientKind::SearchAdministrator => &self.search_administrator,
      ClientKind::Analyzer => &self.analyzer,
    }
  }

  pub fn kind_mut(&mut self, kind: ClientKind) -> &mut ClientOptionsBuilder {
    match kind {
      ClientKind::Tracker => &mut self.tracker,
      ClientKind::Recommender => &mut self.recommender,
      ClientKind::Searcher => &mut self.searcher,
      ClientKind::DataAccessor => &mut self.data_accessor,
      ClientKind::SearchAdministrator => &mut self.search_administrator,
      ClientKind::Analyzer => &mut self.analyzer,
    }
  }

  /// Overlays every set field of `other`, level by level.
  pub fn overlay(&mut self, other: &ClientsOptionsBuilder) {
    self.global.overlay(&other.global);
    for kind in ClientKind::ALL {
      self.kind_mut(kind).overlay(other.kind(kind));
    }
  }
}

/// Named client declarations, keyed by case-sensitive name.
///
/// Named clients allow access to multiple datasets from the same application,
/// or different settings (e.g. a longer timeout) for integration jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedClients {
  clients: BTreeMap<String, ClientsOptionsBuilder>,
}

impl NamedClients {
  /// Adds a named client, or configures the existing one with that name.
  pub fn add<F>(&mut self, name: impl Into<String>, configure: F) -> &mut Self
  where
    F: FnOnce(&mut ClientsOptionsBuilder),
  {
    configure(self.clients.entry(name.into()).or_default());
    self
  }

  /// Adds a named client, failing with [`RelewiseError::DuplicateName`] if it exists.
  pub fn try_add<F>(&mut self, name: impl Into<String>, configure: F) -> Result<&mut Self, RelewiseError>
  where
    F: FnOnce(&mut ClientsOptionsBuilder),
  {
    let name = name.into();
    if self.clients.contains_key(&name) {
      return Err(RelewiseError::DuplicateName { name });
    }

    let mut builder = ClientsOptionsBuilder::default();
    configure(&mut builder);
    self.clients.insert(name, builder);
    Ok(self)
  }

  pub fn get(&self, name: &str) -> Option<&ClientsOptionsBuilder> {
    self.clients.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.clients.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.clients.keys().map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &ClientsOptionsBuilder)> {
    self.clients.iter().map(|(name, builder)| (name.as_str(), builder))
  }

  pub fn len(&self) -> usize {
    self.clients.len()
  }

  pub fn is_empty(&self) -> bool {
    self.clients.is_empty()
  }
}

/// Root of the configuration tree.
///
/// Dereferences to the top-level [`ClientsOptionsBuilder`], so the global and
/// per-kind drafts are reachable directly:
///
/// ```
/// use relewise_clients::options::RelewiseOptionsBuilder;
/// use std::time::Duration;
/// use uuid::Uuid;
///
/// let mut options = RelewiseOptionsBuilder::new();
/// options.global.dataset_id = Some(Uuid::new_v4());
/// options.global.api_key = Some("r4FqfMqtiZjJmoN".into());
/// options.tracker.timeout = Some(Duration::from_secs(3));
/// options.named.add("Integration", |integration| {
///   integration.global.timeout = Some(Duration::from_secs(20));
/// });
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelewiseOptionsBuilder {
  clients: ClientsOptionsBuilder,
  pub named: NamedClients,
}

impl RelewiseOptionsBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// The top-level drafts, without the named clients.
  pub fn clients(&self) -> &ClientsOptionsBuilder {
    &self.clients
  }

  /// Resolves options straight from the builder tree.
  ///
  /// `name: None` resolves the default client of `kind` and fails with
  /// [`RelewiseError::NotRegistered`] when that kind was never configured.
  pub fn resolve(&self, kind: ClientKind, name: Option<&str>) -> Result<ClientOptions, RelewiseError> {
    let key = ClientKey {
      name: name.map(str::to_string),
      kind,
    };

    let resolved = match name {
      None => self
        .resolve_default(kind)
        .map_err(|e| e.for_client(key.clone()))?,
      Some(name) => {
        let named = self
          .named
          .get(name)
          .ok_or_else(|| RelewiseError::not_registered(key.clone(), NotRegisteredReason::UnknownName))?;
        let parent = self
          .resolve_default(kind)
          .map_err(|e| e.for_client(ClientKey::default_client(kind)))?;
        Some(resolve_named(named, kind, parent.as_ref()).map_err(|e| e.for_client(key.clone()))?)
      }
    };

    resolved.ok_or_else(|| RelewiseError::not_registered(key, NotRegisteredReason::NotConfigured))
  }

  /// Process-wide defaults for `kind`: `resolve(K, resolve(global, None))`.
  pub(crate) fn resolve_default(&self, kind: ClientKind) -> Result<Option<ClientOptions>, ConfigError> {
    let global = self.clients.global.build(None)?;
    self.clients.kind(kind).build(global.as_ref())
  }
}

/// Resolves a named client's kind on top of the process-wide defaults for that kind.
///
/// A named client must resolve; an absent result means no dataset id was given anywhere.
pub(crate) fn resolve_named(
  named: &ClientsOptionsBuilder,
  kind: ClientKind,
  parent: Option<&ClientOptions>,
) -> Result<ClientOptions, ConfigError> {
  let named_global = named.global.build(parent)?;
  named
    .kind(kind)
    .build(named_global.as_ref())?
    .ok_or(ConfigError::MissingDatasetId)
}

impl Deref for RelewiseOptionsBuilder {
  type Target = ClientsOptionsBuilder;

  fn deref(&self) -> &Self::Target {
    &self.clients
  }
}

impl DerefMut for RelewiseOptionsBuilder {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.clients
  }
}

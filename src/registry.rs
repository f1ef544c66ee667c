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
use crate::client::Analyzer;
use crate::client::Client;
use crate::client::ConstructedClient;
use crate::client::DataAccessor;
use crate::client::Recommender;
use crate::client::SearchAdministrator;
use crate::client::Searcher;
use crate::client::Tracker;
use crate::client::construct;
use crate::error::ConfigError;
use crate::error::NotRegisteredReason;
use crate::error::RelewiseError;
use crate::error::Result;
use crate::kind::ClientKey;
use crate::kind::ClientKind;
use crate::options::ClientOptions;
use crate::options::RelewiseOptionsBuilder;
use crate::options::resolve_named;
use std::any::type_name;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

struct RegisteredClient {
  options: ClientOptions,
  constructed: ConstructedClient,
}

/// Resolved options of one named client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedClientOptions {
  name: String,
  options: Option<ClientOptions>,
  clients: BTreeMap<ClientKind, ClientOptions>,
}

impl NamedClientOptions {
  /// The name the client was registered under.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The named client's own level resolved over the top-level global options.
  ///
  /// `None` when that level does not amount to complete options on its own,
  /// e.g. when api keys are only given per kind.
  pub fn options(&self) -> Option<&ClientOptions> {
    self.options.as_ref()
  }

  /// Options of the client of `kind`. Every kind of a named client is resolved.
  pub fn client(&self, kind: ClientKind) -> Option<&ClientOptions> {
    self.clients.get(&kind)
  }

  pub fn tracker(&self) -> Option<&ClientOptions> {
    self.client(ClientKind::Tracker)
  }

  pub fn recommender(&self) -> Option<&ClientOptions> {
    self.client(ClientKind::Recommender)
  }

  pub fn searcher(&self) -> Option<&ClientOptions> {
    self.client(ClientKind::Searcher)
  }
}

/// Resolved options and constructed clients, built once at startup.
///
/// The registry is immutable after [`ClientRegistry::new`] and can be shared
/// between threads (e.g. in an `Arc`).
pub struct ClientRegistry {
  clients: HashMap<ClientKey, RegisteredClient>,
  named: BTreeMap<String, NamedClientOptions>,
}

impl ClientRegistry {
  /// Resolves and constructs every configured client.
  ///
  /// Fails on the first client whose options do not validate. A default
  /// client without any dataset id is not registered; a named client must
  /// resolve for every kind.
  pub fn new(options: RelewiseOptionsBuilder) -> Result<Self> {
    let span = tracing::info_span!("client_registry");
    let _enter = span.enter();

    let mut clients = HashMap::new();
    let mut defaults = BTreeMap::new();

    for kind in ClientKind::ALL {
      let key = ClientKey::default_client(kind);
      match options
        .resolve_default(kind)
        .map_err(|e| e.for_client(key.clone()))?
      {
        Some(resolved) => {
          tracing::debug!(%key, options = ?resolved, "Resolved client");
          defaults.insert(kind, resolved.clone());
          clients.insert(key, register(kind, resolved));
        }
        None => tracing::debug!(%key, "No dataset id configured; client not registered"),
      }
    }

    let top_global = options.global.build(None).ok().flatten();
    let mut named = BTreeMap::new();

    for (name, builder) in options.named.iter() {
      if name.trim().is_empty() {
        return Err(ConfigError::BlankClientName.into());
      }

      let mut resolved_kinds = BTreeMap::new();
      for kind in ClientKind::ALL {
        let key = ClientKey::named(name, kind);
        let resolved =
          resolve_named(builder, kind, defaults.get(&kind)).map_err(|e| e.for_client(key.clone()))?;

        tracing::debug!(%key, options = ?resolved, "Resolved client");
        resolved_kinds.insert(kind, resolved.clone());
        clients.insert(key, register(kind, resolved));
      }

      let own = match builder.global.build(top_global.as_ref()) {
        Ok(own) => own,
        Err(e) => {
          tracing::debug!(name, error = %e, "Named client has no complete options of its own");
          None
        }
      };

      named.insert(
        name.to_string(),
        NamedClientOptions {
          name: name.to_string(),
          options: own,
          clients: resolved_kinds,
        },
      );
    }

    tracing::info!(
      defaults = defaults.len(),
      named = named.len(),
      "Relewise clients registered"
    );

    Ok(ClientRegistry { clients, named })
  }

  /// Resolved options of the client of `kind`, default when `name` is `None`.
  pub fn options(&self, kind: ClientKind, name: Option<&str>) -> Result<&ClientOptions> {
    self.entry(kind, name).map(|entry| &entry.options)
  }

  /// The client of `kind`, seen through the common [`Client`] trait.
  pub fn client(&self, kind: ClientKind, name: Option<&str>) -> Result<Arc<dyn Client>> {
    self
      .entry(kind, name)
      .map(|entry| Arc::clone(&entry.constructed.client))
  }

  /// Looks a client up by its capability type, e.g. `get_client::<dyn Tracker>(None)`.
  ///
  /// Passing a concrete client type such as `TrackerClient` fails with
  /// [`RelewiseError::InvalidUsage`].
  pub fn get_client<T: ?Sized + 'static>(&self, name: Option<&str>) -> Result<Arc<T>> {
    let kind = ClientKind::of::<T>()?;
    let entry = self.entry(kind, name)?;

    entry
      .constructed
      .capability
      .downcast_ref::<Arc<T>>()
      .cloned()
      .ok_or_else(|| RelewiseError::InvalidUsage {
        message: format!("the {kind} client is not a `{}`", type_name::<T>()),
      })
  }

  pub fn tracker(&self, name: Option<&str>) -> Result<Arc<dyn Tracker>> {
    self.get_client::<dyn Tracker>(name)
  }

  pub fn recommender(&self, name: Option<&str>) -> Result<Arc<dyn Recommender>> {
    self.get_client::<dyn Recommender>(name)
  }

  pub fn searcher(&self, name: Option<&str>) -> Result<Arc<dyn Searcher>> {
    self.get_client::<dyn Searcher>(name)
  }

  pub fn data_accessor(&self, name: Option<&str>) -> Result<Arc<dyn DataAccessor>> {
    self.get_client::<dyn DataAccessor>(name)
  }

  pub fn search_administrator(&self, name: Option<&str>) -> Result<Arc<dyn SearchAdministrator>> {
    self.get_client::<dyn SearchAdministrator>(name)
  }

  pub fn analyzer(&self, name: Option<&str>) -> Result<Arc<dyn Analyzer>> {
    self.get_client::<dyn Analyzer>(name)
  }

  /// Names of every named client, in sorted order.
  pub fn client_names(&self) -> Vec<&str> {
    self.named.keys().map(String::as_str).collect()
  }

  pub fn named(&self, name: &str) -> Result<&NamedClientOptions> {
    self
      .named
      .get(name)
      .ok_or_else(|| RelewiseError::unknown_name(name))
  }

  /// Kinds that have a default (unnamed) client.
  pub fn default_kinds(&self) -> Vec<ClientKind> {
    ClientKind::ALL
      .into_iter()
      .filter(|kind| self.clients.contains_key(&ClientKey::default_client(*kind)))
      .collect()
  }

  fn entry(&self, kind: ClientKind, name: Option<&str>) -> Result<&RegisteredClient> {
    if let Some(name) = name {
      if name.trim().is_empty() {
        return Err(RelewiseError::InvalidUsage {
          message: "client name cannot be null or empty".to_string(),
        });
      }

      if !self.named.contains_key(name) {
        return Err(RelewiseError::not_registered(
          ClientKey::named(name, kind),
          NotRegisteredReason::UnknownName,
        ));
      }
    }

    let key = ClientKey {
      name: name.map(str::to_string),
      kind,
    };

    self
      .clients
      .get(&key)
      .ok_or_else(|| RelewiseError::not_registered(key, NotRegisteredReason::NotConfigured))
  }
}

fn register(kind: ClientKind, options: ClientOptions) -> RegisteredClient {
  RegisteredClient {
    constructed: construct(kind, options.clone()),
    options,
  }
}

impl fmt::Debug for ClientRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut keys: Vec<&ClientKey> = self.clients.keys().collect();
    keys.sort();

    f.debug_struct("ClientRegistry")
      .field("clients", &keys)
      .field("named", &self.named.keys().collect::<Vec<_>>())
      .finish()
  }
}

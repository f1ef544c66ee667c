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
use crate::error::RelewiseError;
use crate::error::Result;
use crate::kind::ClientKind;
use crate::options::ClientOptions;
use std::any::Any;
use std::any::TypeId;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Server targeted when no `ServerUrl` is resolved for a client.
pub const DEFAULT_SERVER_URL: &str = "https://api.relewise.com/";

/// Behaviour shared by every Relewise client.
pub trait Client: Send + Sync + fmt::Debug {
  fn kind(&self) -> ClientKind;

  fn options(&self) -> &ClientOptions;

  fn dataset_id(&self) -> Uuid {
    self.options().dataset_id()
  }

  fn api_key(&self) -> &str {
    self.options().api_key()
  }

  fn timeout(&self) -> Duration {
    self.options().timeout()
  }

  /// The resolved server url, or [`DEFAULT_SERVER_URL`].
  fn server_url(&self) -> &str {
    self
      .options()
      .server_url()
      .map_or(DEFAULT_SERVER_URL, |url| url.as_str())
  }
}

/// A client as stored by the registry: the same instance seen through its
/// capability trait (boxed as `Arc<dyn Capability>`) and through [`Client`].
pub(crate) struct ConstructedClient {
  pub(crate) client: Arc<dyn Client>,
  pub(crate) capability: Box<dyn Any + Send + Sync>,
}

macro_rules! clients {
  ($(
    $(#[$doc:meta])*
    $kind:ident => $capability:ident, $client:ident;
  )*) => {
    $(
      $(#[$doc])*
      pub trait $capability: Client {}

      #[doc = concat!("Default [`", stringify!($capability), "`], holding its resolved options.")]
      #[derive(Debug, Clone, PartialEq, Eq)]
      pub struct $client {
        options: ClientOptions,
      }

      impl $client {
        pub fn new(options: ClientOptions) -> Self {
          $client { options }
        }
      }

      impl Client for $client {
        fn kind(&self) -> ClientKind {
          ClientKind::$kind
        }

        fn options(&self) -> &ClientOptions {
          &self.options
        }
      }

      impl $capability for $client {}
    )*

    impl ClientKind {
      /// Maps a capability type such as `dyn Tracker` to its kind.
      ///
      /// Concrete clients (`TrackerClient`) and unrelated types are rejected
      /// with [`RelewiseError::InvalidUsage`]; lookups are made by capability.
      pub fn of<T: ?Sized + 'static>() -> Result<ClientKind> {
        let id = TypeId::of::<T>();

        $(
          if id == TypeId::of::<dyn $capability>() {
            return Ok(ClientKind::$kind);
          }
        )*

        $(
          if id == TypeId::of::<$client>() {
            return Err(RelewiseError::InvalidUsage {
              message: format!(
                "expected a client capability such as `dyn {}`, got the concrete type `{}`",
                stringify!($capability),
                type_name::<T>()
              ),
            });
          }
        )*

        Err(RelewiseError::InvalidUsage {
          message: format!("`{}` is not a Relewise client capability", type_name::<T>()),
        })
      }
    }

    pub(crate) fn construct(kind: ClientKind, options: ClientOptions) -> ConstructedClient {
      match kind {
        $(
          ClientKind::$kind => {
            let client = Arc::new($client::new(options));
            let capability: Arc<dyn $capability> = client.clone();
            ConstructedClient {
              client,
              capability: Box::new(capability),
            }
          }
        )*
      }
    }
  };
}

clients! {
  /// Tracks user behaviour such as product views and orders.
  Tracker => Tracker, TrackerClient;
  /// Requests recommendations.
  Recommender => Recommender, RecommenderClient;
  /// Performs searches.
  Searcher => Searcher, SearcherClient;
  /// Reads stored data such as products and content.
  DataAccessor => DataAccessor, DataAccessorClient;
  /// Manages search settings such as synonyms and redirects.
  SearchAdministrator => SearchAdministrator, SearchAdministratorClient;
  /// Reads analytics.
  Analyzer => Analyzer, AnalyzerClient;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn options() -> ClientOptions {
    ClientOptions::new(Uuid::new_v4(), "key", Duration::from_secs(3), None).unwrap()
  }

  #[test]
  fn capabilities_map_to_kinds() {
    assert_eq!(ClientKind::of::<dyn Tracker>().unwrap(), ClientKind::Tracker);
    assert_eq!(ClientKind::of::<dyn Searcher>().unwrap(), ClientKind::Searcher);
    assert_eq!(
      ClientKind::of::<dyn SearchAdministrator>().unwrap(),
      ClientKind::SearchAdministrator
    );
  }

  #[test]
  fn concrete_and_foreign_types_are_invalid_usage() {
    let err = ClientKind::of::<TrackerClient>().unwrap_err();
    assert!(err.is_invalid_usage());
    assert!(err.to_string().contains("dyn Tracker"));

    assert!(ClientKind::of::<String>().unwrap_err().is_invalid_usage());
    assert!(ClientKind::of::<dyn Client>().unwrap_err().is_invalid_usage());
  }

  #[test]
  fn construct_exposes_the_capability() {
    for kind in ClientKind::ALL {
      let constructed = construct(kind, options());
      assert_eq!(constructed.client.kind(), kind);
    }

    let constructed = construct(ClientKind::Recommender, options());
    assert!(constructed.capability.downcast_ref::<Arc<dyn Recommender>>().is_some());
    assert!(constructed.capability.downcast_ref::<Arc<dyn Tracker>>().is_none());
  }

  #[test]
  fn server_url_falls_back_to_default() {
    let client = TrackerClient::new(options());
    assert_eq!(client.server_url(), DEFAULT_SERVER_URL);

    let staged = ClientOptions::new(
      Uuid::new_v4(),
      "key",
      Duration::from_secs(3),
      Some("https://stage01-api.relewise.com"),
    )
    .unwrap();
    assert_eq!(
      AnalyzerClient::new(staged).server_url(),
      "https://stage01-api.relewise.com/"
    );
  }
}

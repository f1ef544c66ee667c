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
use crate::error::ParseClientKindError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The capability roles a client can be resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ClientKind {
  Tracker,
  Recommender,
  Searcher,
  DataAccessor,
  SearchAdministrator,
  Analyzer,
}

impl ClientKind {
  pub const ALL: [ClientKind; 6] = [
    ClientKind::Tracker,
    ClientKind::Recommender,
    ClientKind::Searcher,
    ClientKind::DataAccessor,
    ClientKind::SearchAdministrator,
    ClientKind::Analyzer,
  ];

  /// The key used for this kind in a configuration section, e.g. `DataAccessor`.
  pub fn as_str(self) -> &'static str {
    match self {
      ClientKind::Tracker => "Tracker",
      ClientKind::Recommender => "Recommender",
      ClientKind::Searcher => "Searcher",
      ClientKind::DataAccessor => "DataAccessor",
      ClientKind::SearchAdministrator => "SearchAdministrator",
      ClientKind::Analyzer => "Analyzer",
    }
  }
}

impl fmt::Display for ClientKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Accepts `DataAccessor`, `dataaccessor`, `data-accessor` and `data_accessor`.
impl FromStr for ClientKind {
  type Err = ParseClientKindError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let folded: String = s
      .chars()
      .filter(|c| *c != '-' && *c != '_')
      .collect::<String>()
      .to_ascii_lowercase();

    ClientKind::ALL
      .into_iter()
      .find(|kind| kind.as_str().eq_ignore_ascii_case(&folded))
      .ok_or_else(|| ParseClientKindError(s.to_string()))
  }
}

/// Registry lookup key: an optional client name plus the client kind.
///
/// `name: None` addresses the default (unnamed) client of that kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey {
  pub name: Option<String>,
  pub kind: ClientKind,
}

impl ClientKey {
  pub fn default_client(kind: ClientKind) -> Self {
    ClientKey { name: None, kind }
  }

  pub fn named(name: impl Into<String>, kind: ClientKind) -> Self {
    ClientKey {
      name: Some(name.into()),
      kind,
    }
  }
}

impl fmt::Display for ClientKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "{} client '{}'", self.kind, name),
      None => write!(f, "default {} client", self.kind),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_kinds_loosely() {
    assert_eq!("tracker".parse::<ClientKind>(), Ok(ClientKind::Tracker));
    assert_eq!("DataAccessor".parse::<ClientKind>(), Ok(ClientKind::DataAccessor));
    assert_eq!("search-administrator".parse::<ClientKind>(), Ok(ClientKind::SearchAdministrator));
    assert_eq!("search_administrator".parse::<ClientKind>(), Ok(ClientKind::SearchAdministrator));
    assert!("indexer".parse::<ClientKind>().is_err());
  }

  #[test]
  fn keys_with_underscores_do_not_collide() {
    let a = ClientKey::named("a_Tracker", ClientKind::Searcher);
    let b = ClientKey::named("a", ClientKind::Tracker);
    assert_ne!(a, b);
    assert_eq!(b.to_string(), "Tracker client 'a'");
    assert_eq!(
      ClientKey::default_client(ClientKind::Analyzer).to_string(),
      "default Analyzer client"
    );
  }
}

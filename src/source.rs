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

//! Reads options from a key-value configuration source.
//!
//! Any [`Figment`] works as a source. The expected shape, with keys matched
//! case-insensitively, is:
//!
//! ```json
//! {
//!   "Relewise": {
//!     "DatasetId": "6d9361aa-a23d-4bf2-a818-5aba792e2102",
//!     "ApiKey": "r4FqfMqtiZjJmoN",
//!     "Timeout": "00:00:10",
//!     "ServerUrl": "https://api.relewise.com",
//!     "Tracker": { "Timeout": "00:00:03" },
//!     "Named": {
//!       "ContentSite": { "DatasetId": "b57cb490-1556-4f06-aa26-96451533a9b8" }
//!     }
//!   }
//! }
//! ```
//!
//! Fields present in the source overwrite the builder; absent fields leave it untouched.

use crate::duration::format_timeout;
use crate::duration::parse_timeout;
use crate::duration::timeout_from_secs;
use crate::error::ConfigError;
use crate::error::RelewiseError;
use crate::error::Result;
use crate::kind::ClientKind;
use crate::options::ClientOptionsBuilder;
use crate::options::ClientsOptionsBuilder;
use crate::options::RelewiseOptionsBuilder;
use figment::Figment;
use figment::providers::Env;
use figment::providers::Format;
use figment::providers::Json;
use figment::providers::Serialized;
use figment::providers::Toml;
use figment::value::Dict;
use figment::value::Value;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Section read when none is given.
pub const DEFAULT_SECTION: &str = "Relewise";

const NAMED_KEY: &str = "named";

/// What to do when the source declares a named client that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateNames {
  /// Overlay the source's values onto the existing named client.
  #[default]
  Merge,
  /// Fail with [`RelewiseError::DuplicateName`].
  Reject,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
  Text(String),
  Unsigned(u64),
  Signed(i64),
  Float(f64),
}

impl Scalar {
  fn into_text(self) -> String {
    match self {
      Scalar::Text(text) => text,
      Scalar::Unsigned(n) => n.to_string(),
      Scalar::Signed(n) => n.to_string(),
      Scalar::Float(n) => n.to_string(),
    }
  }

  fn into_timeout(self) -> Result<Duration, ConfigError> {
    match self {
      Scalar::Text(text) => parse_timeout(&text),
      Scalar::Unsigned(seconds) => Ok(Duration::from_secs(seconds)),
      Scalar::Signed(seconds) => timeout_from_secs(seconds as f64),
      Scalar::Float(seconds) => timeout_from_secs(seconds),
    }
  }
}

fn client_builder(
  dataset_id: Option<Uuid>,
  api_key: Option<Scalar>,
  timeout: Option<Scalar>,
  server_url: Option<String>,
) -> Result<ClientOptionsBuilder, ConfigError> {
  Ok(ClientOptionsBuilder {
    dataset_id,
    api_key: api_key.map(Scalar::into_text),
    timeout: timeout.map(Scalar::into_timeout).transpose()?,
    server_url,
  })
}

/// Options of a single client kind, e.g. `Relewise:Tracker`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClientSection {
  #[serde(rename = "datasetid")]
  dataset_id: Option<Uuid>,
  #[serde(rename = "apikey")]
  api_key: Option<Scalar>,
  timeout: Option<Scalar>,
  #[serde(rename = "serverurl")]
  server_url: Option<String>,
}

impl ClientSection {
  fn into_builder(self) -> Result<ClientOptionsBuilder, ConfigError> {
    client_builder(self.dataset_id, self.api_key, self.timeout, self.server_url)
  }
}

/// The Relewise section itself, and every entry below `Named`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Section {
  #[serde(rename = "datasetid")]
  dataset_id: Option<Uuid>,
  #[serde(rename = "apikey")]
  api_key: Option<Scalar>,
  timeout: Option<Scalar>,
  #[serde(rename = "serverurl")]
  server_url: Option<String>,

  tracker: Option<ClientSection>,
  recommender: Option<ClientSection>,
  searcher: Option<ClientSection>,
  #[serde(rename = "dataaccessor")]
  data_accessor: Option<ClientSection>,
  #[serde(rename = "searchadministrator")]
  search_administrator: Option<ClientSection>,
  analyzer: Option<ClientSection>,

  named: BTreeMap<String, Section>,
}

impl Section {
  fn into_builder(self) -> Result<ClientsOptionsBuilder, ConfigError> {
    let mut builder = ClientsOptionsBuilder {
      global: client_builder(self.dataset_id, self.api_key, self.timeout, self.server_url)?,
      ..Default::default()
    };

    let kinds = [
      (ClientKind::Tracker, self.tracker),
      (ClientKind::Recommender, self.recommender),
      (ClientKind::Searcher, self.searcher),
      (ClientKind::DataAccessor, self.data_accessor),
      (ClientKind::SearchAdministrator, self.search_administrator),
      (ClientKind::Analyzer, self.analyzer),
    ];
    for (kind, section) in kinds {
      if let Some(section) = section {
        *builder.kind_mut(kind) = section.into_builder()?;
      }
    }

    Ok(builder)
  }
}

impl RelewiseOptionsBuilder {
  /// Reads and sets all options found in `section` of `source`.
  ///
  /// Named clients that already exist are merged; see
  /// [`read_from_configuration_with`](Self::read_from_configuration_with).
  pub fn read_from_configuration(&mut self, source: &Figment, section: &str) -> Result<&mut Self> {
    self.read_from_configuration_with(source, section, DuplicateNames::Merge)
  }

  /// Reads and sets all options found in `section` of `source`.
  ///
  /// `section` may point into nested data with `:` or `.`, e.g. `App:Relewise`.
  pub fn read_from_configuration_with(
    &mut self,
    source: &Figment,
    section: &str,
    duplicates: DuplicateNames,
  ) -> Result<&mut Self> {
    if section.trim().is_empty() {
      return Err(RelewiseError::InvalidUsage {
        message: "section name cannot be null or empty".to_string(),
      });
    }

    let read_error = |source: figment::Error| ConfigError::ReadSection {
      section: section.to_string(),
      example: example_hint(section),
      source: Box::new(source),
    };

    let root: Dict = source.extract().map_err(read_error)?;

    let found = match find_section(root, section) {
      Some(Value::Dict(_, dict)) if !dict.is_empty() => dict,
      Some(Value::Dict(..)) | None => {
        return Err(
          ConfigError::SectionNotFound {
            section: section.to_string(),
            example: example_hint(section),
          }
          .into(),
        );
      }
      Some(other) => {
        return Err(
          read_error(figment::Error::from(format!(
            "expected '{section}' to hold keys and values, found {other:?}"
          )))
          .into(),
        );
      }
    };

    let parsed: Section = Figment::from(Serialized::defaults(fold_keys(found, false)))
      .extract()
      .map_err(read_error)?;

    tracing::debug!(
      section,
      named = parsed.named.len(),
      "Read Relewise configuration section"
    );

    self.apply_section(parsed, duplicates)?;
    Ok(self)
  }

  // Converts and checks everything before touching `self`, so a failed read leaves it unchanged.
  fn apply_section(&mut self, mut section: Section, duplicates: DuplicateNames) -> Result<()> {
    let named = std::mem::take(&mut section.named);
    let top = section.into_builder()?;

    let mut builders = Vec::with_capacity(named.len());
    for (name, mut named_section) in named {
      if !named_section.named.is_empty() {
        tracing::warn!(name = %name, "Ignoring 'Named' clients nested inside a named client");
        named_section.named.clear();
      }
      builders.push((name, named_section.into_builder()?));
    }

    if duplicates == DuplicateNames::Reject {
      if let Some((name, _)) = builders.iter().find(|(name, _)| self.named.contains(name)) {
        return Err(RelewiseError::DuplicateName { name: name.clone() });
      }
    }

    self.overlay(&top);
    for (name, builder) in builders {
      self.named.add(name, |existing| existing.overlay(&builder));
    }

    Ok(())
  }
}

/// Walks `path` (segments separated by `:` or `.`), matching keys case-insensitively.
fn find_section(mut dict: Dict, path: &str) -> Option<Value> {
  let mut segments = path.split([':', '.']).peekable();

  loop {
    let segment = segments.next()?;
    let value = take_ignore_case(&mut dict, segment)?;

    if segments.peek().is_none() {
      return Some(value);
    }

    match value {
      Value::Dict(_, child) => dict = child,
      _ => return None,
    }
  }
}

// Keys differing only in case are merged; later keys in sort order win, so
// lowercase keys (as produced by the environment provider) override PascalCase ones.
fn take_ignore_case(dict: &mut Dict, segment: &str) -> Option<Value> {
  let keys: Vec<String> = dict
    .keys()
    .filter(|key| key.eq_ignore_ascii_case(segment))
    .cloned()
    .collect();

  keys
    .into_iter()
    .filter_map(|key| dict.remove(&key))
    .reduce(merge_values)
}

fn merge_values(base: Value, overlay: Value) -> Value {
  match (base, overlay) {
    (Value::Dict(tag, mut base), Value::Dict(_, overlay)) => {
      for (key, value) in overlay {
        let merged = match base.remove(&key) {
          Some(existing) => merge_values(existing, value),
          None => value,
        };
        base.insert(key, merged);
      }
      Value::Dict(tag, base)
    }
    (_, overlay) => overlay,
  }
}

/// Lowercases every key, except the client names directly below `Named`.
fn fold_keys(dict: Dict, preserve_case: bool) -> Dict {
  let mut folded = Dict::new();

  for (key, value) in dict {
    let key = if preserve_case {
      key
    } else {
      key.to_ascii_lowercase()
    };

    let value = match value {
      Value::Dict(tag, child) => {
        let names_below = !preserve_case && key == NAMED_KEY;
        Value::Dict(tag, fold_keys(child, names_below))
      }
      other => other,
    };

    let value = match folded.remove(&key) {
      Some(existing) => merge_values(existing, value),
      None => value,
    };
    folded.insert(key, value);
  }

  folded
}

/// Example configuration section, shown to operators when reading fails.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExampleSection {
  dataset_id: Uuid,
  api_key: &'static str,
  timeout: String,
  server_url: &'static str,
}

pub fn example(section: &str) -> BTreeMap<String, ExampleSection> {
  let example = ExampleSection {
    dataset_id: Uuid::nil(),
    api_key: "<ApiKey>",
    timeout: format_timeout(Duration::from_secs(3)),
    server_url: "<ServerUrl>",
  };

  BTreeMap::from([(section.to_string(), example)])
}

pub fn example_json(section: &str) -> Result<String, serde_json::Error> {
  serde_json::to_string_pretty(&example(section))
}

pub fn example_toml(section: &str) -> Result<String, toml::ser::Error> {
  toml::to_string_pretty(&example(section))
}

fn example_hint(section: &str) -> String {
  match example_json(section) {
    Ok(json) => format!("\n\nExample (to be used in e.g. appsettings.json):\n\n{json}"),
    Err(_) => String::new(),
  }
}

/// Builds a source from an optional JSON or TOML file plus environment variables.
///
/// Environment variables use `__` as separator below the section name, e.g.
/// `RELEWISE__TRACKER__TIMEOUT=00:00:03`, and override the file. Environment
/// variable names are case-insensitive, so named clients declared there are
/// lowercased.
pub fn configuration_source(file: Option<&Path>, section: &str) -> Figment {
  let mut figment = Figment::new();

  if let Some(file) = file {
    let is_toml = file
      .extension()
      .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    figment = if is_toml {
      figment.merge(Toml::file(file))
    } else {
      figment.merge(Json::file(file))
    };
  }

  let prefix = format!("{}__", section.replace([':', '.'], "__")).to_ascii_lowercase();
  let env = Env::raw()
    .filter(move |key| key.as_str().to_ascii_lowercase().starts_with(&prefix))
    .split("__");

  // Values are kept as written; `Env` itself would turn `00123` into a number.
  for (key, value) in env.iter() {
    figment = figment.merge(Serialized::default(&key.as_str().to_ascii_lowercase(), value));
  }

  figment
}

#[cfg(test)]
mod tests {
  use super::*;
  use figment::Jail;
  use url::Url;

  const DATASET_ID: &str = "6d9361aa-a23d-4bf2-a818-5aba792e2102";
  const CONTENT_SITE_DATASET_ID: &str = "b57cb490-1556-4f06-aa26-96451533a9b8";

  fn source(json: &str) -> Figment {
    Figment::from(Json::string(json))
  }

  fn read(json: &str, section: &str) -> Result<RelewiseOptionsBuilder> {
    let mut options = RelewiseOptionsBuilder::new();
    options.read_from_configuration(&source(json), section)?;
    Ok(options)
  }

  #[test]
  fn reads_the_full_shape() {
    let options = read(
      &format!(
        r#"{{
          "Relewise": {{
            "DatasetId": "{DATASET_ID}",
            "ApiKey": "r4FqfMqtiZjJmoN",
            "Timeout": "00:00:10",
            "ServerUrl": "https://api.relewise.com",
            "Tracker": {{ "Timeout": 3 }},
            "DataAccessor": {{ "ApiKey": "reader" }},
            "Named": {{
              "ContentSite": {{
                "DatasetId": "{CONTENT_SITE_DATASET_ID}",
                "Searcher": {{ "ServerUrl": "https://stage02-api.relewise.com" }}
              }}
            }}
          }}
        }}"#
      ),
      DEFAULT_SECTION,
    )
    .unwrap();

    let tracker = options.resolve(ClientKind::Tracker, None).unwrap();
    assert_eq!(tracker.dataset_id().to_string(), DATASET_ID);
    assert_eq!(tracker.timeout(), Duration::from_secs(3));
    assert_eq!(
      tracker.server_url().map(Url::as_str),
      Some("https://api.relewise.com/")
    );

    let accessor = options.resolve(ClientKind::DataAccessor, None).unwrap();
    assert_eq!(accessor.api_key(), "reader");
    assert_eq!(accessor.timeout(), Duration::from_secs(10));

    let searcher = options
      .resolve(ClientKind::Searcher, Some("ContentSite"))
      .unwrap();
    assert_eq!(searcher.dataset_id().to_string(), CONTENT_SITE_DATASET_ID);
    assert_eq!(searcher.api_key(), "r4FqfMqtiZjJmoN");
    assert_eq!(
      searcher.server_url().map(Url::as_str),
      Some("https://stage02-api.relewise.com/")
    );
  }

  #[test]
  fn keys_are_case_insensitive_but_names_are_not() {
    let options = read(
      &format!(
        r#"{{ "relewise": {{ "DATASETID": "{DATASET_ID}", "apiKey": "k", "named": {{ "Integration": {{ "TIMEOUT": "20s" }} }} }} }}"#
      ),
      "RELEWISE",
    )
    .unwrap();

    assert!(options.named.contains("Integration"));
    assert!(!options.named.contains("integration"));
    assert_eq!(
      options
        .resolve(ClientKind::Tracker, Some("Integration"))
        .unwrap()
        .timeout(),
      Duration::from_secs(20)
    );
  }

  #[test]
  fn nested_section_paths() {
    let json = format!(r#"{{ "App": {{ "Stage": {{ "DatasetId": "{DATASET_ID}", "ApiKey": "k" }} }} }}"#);
    assert!(read(&json, "App:Stage").is_ok());
    assert!(read(&json, "app.stage").is_ok());
  }

  #[test]
  fn missing_section_shows_an_example() {
    let err = read(r#"{ "Other": { "ApiKey": "k" } }"#, DEFAULT_SECTION).unwrap_err();
    assert!(err.is_invalid_configuration());

    let message = err.to_string();
    assert!(message.contains("'Relewise' was not found"), "{message}");
    assert!(message.contains("\"ApiKey\": \"<ApiKey>\""), "{message}");
    assert!(message.contains("00000000-0000-0000-0000-000000000000"), "{message}");
  }

  #[test]
  fn unreadable_section_is_invalid_configuration() {
    let err = read(r#"{ "Relewise": { "DatasetId": "not-a-guid" } }"#, DEFAULT_SECTION).unwrap_err();
    assert!(matches!(
      err,
      RelewiseError::InvalidConfiguration(ConfigError::ReadSection { .. })
    ));

    let err = read(r#"{ "Relewise": "nope" }"#, DEFAULT_SECTION).unwrap_err();
    assert!(err.is_invalid_configuration());

    let err = read(r#"{ "Relewise": { "Timeout": "-00:00:01" } }"#, DEFAULT_SECTION).unwrap_err();
    assert!(matches!(
      err,
      RelewiseError::InvalidConfiguration(ConfigError::NonPositiveTimeout { .. })
    ));
  }

  #[test]
  fn blank_section_name_is_invalid_usage() {
    assert!(read("{}", "  ").unwrap_err().is_invalid_usage());
  }

  #[test]
  fn absent_fields_keep_programmatic_values() {
    let mut options = RelewiseOptionsBuilder::new();
    options.global.api_key = Some("programmatic".into());
    options.global.timeout = Some(Duration::from_secs(7));
    options.tracker.timeout = Some(Duration::from_secs(1));

    options
      .read_from_configuration(
        &source(&format!(
          r#"{{ "Relewise": {{ "DatasetId": "{DATASET_ID}", "Timeout": "00:00:09" }} }}"#
        )),
        DEFAULT_SECTION,
      )
      .unwrap();

    assert_eq!(options.global.api_key.as_deref(), Some("programmatic"));
    assert_eq!(options.global.timeout, Some(Duration::from_secs(9)));
    assert_eq!(options.tracker.timeout, Some(Duration::from_secs(1)));
  }

  #[test]
  fn duplicate_named_clients() {
    let json = r#"{ "Relewise": { "Named": { "Integration": { "ApiKey": "from-source" } } } }"#;

    let mut options = RelewiseOptionsBuilder::new();
    options.named.add("Integration", |named| {
      named.global.timeout = Some(Duration::from_secs(20));
    });

    let mut merged = options.clone();
    merged.read_from_configuration(&source(json), DEFAULT_SECTION).unwrap();
    let integration = merged.named.get("Integration").unwrap();
    assert_eq!(integration.global.api_key.as_deref(), Some("from-source"));
    assert_eq!(integration.global.timeout, Some(Duration::from_secs(20)));

    let err = options
      .read_from_configuration_with(&source(json), DEFAULT_SECTION, DuplicateNames::Reject)
      .unwrap_err();
    assert!(err.is_duplicate_name());
  }

  #[test]
  fn failed_reads_leave_options_unchanged() {
    let mut options = RelewiseOptionsBuilder::new();
    options.global.api_key = Some("programmatic".into());
    options.named.add("Integration", |named| {
      named.global.timeout = Some(Duration::from_secs(20));
    });
    let before = options.clone();

    let duplicate = r#"{ "Relewise": { "ApiKey": "from-source", "Named": { "Integration": { "ApiKey": "named" }, "Other": { "Timeout": 3 } } } }"#;
    let err = options
      .read_from_configuration_with(&source(duplicate), DEFAULT_SECTION, DuplicateNames::Reject)
      .unwrap_err();
    assert!(err.is_duplicate_name());
    assert_eq!(options, before);

    let bad_timeout = r#"{ "Relewise": { "ApiKey": "from-source", "Named": { "ContentSite": { "Timeout": "bogus" } } } }"#;
    let err = options
      .read_from_configuration(&source(bad_timeout), DEFAULT_SECTION)
      .unwrap_err();
    assert!(matches!(
      err,
      RelewiseError::InvalidConfiguration(ConfigError::InvalidTimeout { .. })
    ));
    assert_eq!(options, before);
  }

  #[test]
  fn numeric_api_keys_are_text() {
    let options = read(
      &format!(r#"{{ "Relewise": {{ "DatasetId": "{DATASET_ID}", "ApiKey": 12345 }} }}"#),
      DEFAULT_SECTION,
    )
    .unwrap();
    assert_eq!(options.global.api_key.as_deref(), Some("12345"));
  }

  #[test]
  fn environment_overrides_file() {
    Jail::expect_with(|jail| {
      jail.create_file(
        "relewise.json",
        &format!(
          r#"{{ "Relewise": {{ "DatasetId": "{DATASET_ID}", "ApiKey": "file", "Timeout": "00:00:10" }} }}"#
        ),
      )?;
      jail.set_env("RELEWISE__APIKEY", "env");
      jail.set_env("RELEWISE__TRACKER__TIMEOUT", "00:00:03");
      jail.set_env("UNRELATED__TIMEOUT", "nope");

      let source = configuration_source(Some(Path::new("relewise.json")), DEFAULT_SECTION);
      let mut options = RelewiseOptionsBuilder::new();
      options
        .read_from_configuration(&source, DEFAULT_SECTION)
        .map_err(|e| e.to_string())?;

      let tracker = options
        .resolve(ClientKind::Tracker, None)
        .map_err(|e| e.to_string())?;
      assert_eq!(tracker.api_key(), "env");
      assert_eq!(tracker.timeout(), Duration::from_secs(3));

      let searcher = options
        .resolve(ClientKind::Searcher, None)
        .map_err(|e| e.to_string())?;
      assert_eq!(searcher.timeout(), Duration::from_secs(10));
      Ok(())
    });
  }

  #[test]
  fn environment_values_are_kept_as_written() {
    Jail::expect_with(|jail| {
      jail.set_env("RELEWISE__DATASETID", DATASET_ID);
      jail.set_env("RELEWISE__APIKEY", "00123");
      jail.set_env("RELEWISE__TIMEOUT", "10");
      jail.set_env("RELEWISE__NAMED__STAGE__APIKEY", "1e3");

      let source = configuration_source(None, DEFAULT_SECTION);
      let mut options = RelewiseOptionsBuilder::new();
      options
        .read_from_configuration(&source, DEFAULT_SECTION)
        .map_err(|e| e.to_string())?;

      assert_eq!(options.global.api_key.as_deref(), Some("00123"));
      assert_eq!(options.global.timeout, Some(Duration::from_secs(10)));

      let stage = options
        .resolve(ClientKind::Searcher, Some("stage"))
        .map_err(|e| e.to_string())?;
      assert_eq!(stage.api_key(), "1e3");
      Ok(())
    });
  }

  #[test]
  fn toml_files_are_supported() {
    Jail::expect_with(|jail| {
      jail.create_file(
        "relewise.toml",
        &format!("[Relewise]\nDatasetId = \"{DATASET_ID}\"\nApiKey = \"k\"\n\n[Relewise.Named.Integration]\nTimeout = \"30s\"\n"),
      )?;

      let source = configuration_source(Some(Path::new("relewise.toml")), DEFAULT_SECTION);
      let mut options = RelewiseOptionsBuilder::new();
      options
        .read_from_configuration(&source, DEFAULT_SECTION)
        .map_err(|e| e.to_string())?;

      let options = options
        .resolve(ClientKind::Analyzer, Some("Integration"))
        .map_err(|e| e.to_string())?;
      assert_eq!(options.timeout(), Duration::from_secs(30));
      Ok(())
    });
  }

  #[test]
  fn examples_render() {
    assert!(example_toml("Relewise").unwrap().contains("[Relewise]"));
    assert!(example_json("Stage").unwrap().contains("\"Stage\""));
  }
}

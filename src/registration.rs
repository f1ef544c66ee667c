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
use crate::error::Result;
use crate::options::RelewiseOptionsBuilder;
use crate::registry::ClientRegistry;
use figment::Figment;

type Configure = Box<dyn FnOnce(&mut RelewiseOptionsBuilder) -> Result<()>>;

/// Startup entry point: collects configuration callbacks and builds the registry.
///
/// Callbacks run in the order they were added, against one fresh
/// [`RelewiseOptionsBuilder`], when [`Registration::build`] is called.
///
/// ```
/// use relewise_clients::client::Client;
/// use relewise_clients::registration::Registration;
/// use std::time::Duration;
/// use uuid::Uuid;
///
/// let registry = Registration::new()
///   .configure(|options| {
///     options.global.dataset_id = Some(Uuid::new_v4());
///     options.global.api_key = Some("r4FqfMqtiZjJmoN".into());
///   })
///   .configure(|options| {
///     options.named.add("Integration", |integration| {
///       integration.global.timeout = Some(Duration::from_secs(20));
///     });
///   })
///   .build()
///   .unwrap();
///
/// assert_eq!(registry.tracker(Some("Integration")).unwrap().timeout(), Duration::from_secs(20));
/// ```
#[derive(Default)]
pub struct Registration {
  configure: Vec<Configure>,
}

impl Registration {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registration that only reads `section` of `source`.
  pub fn from_configuration(source: Figment, section: impl Into<String>) -> Self {
    let section = section.into();
    Self::new().try_configure(move |options| {
      options.read_from_configuration(&source, &section)?;
      Ok(())
    })
  }

  pub fn configure<F>(self, configure: F) -> Self
  where
    F: FnOnce(&mut RelewiseOptionsBuilder) + 'static,
  {
    self.try_configure(move |options| {
      configure(options);
      Ok(())
    })
  }

  /// Adds a callback that may fail, e.g. one reading a configuration source.
  pub fn try_configure<F>(mut self, configure: F) -> Self
  where
    F: FnOnce(&mut RelewiseOptionsBuilder) -> Result<()> + 'static,
  {
    self.configure.push(Box::new(configure));
    self
  }

  /// Like [`configure`](Self::configure), but with `reset` every earlier callback is dropped first.
  pub fn configure_with_reset<F>(mut self, reset: bool, configure: F) -> Self
  where
    F: FnOnce(&mut RelewiseOptionsBuilder) + 'static,
  {
    if reset {
      tracing::debug!(dropped = self.configure.len(), "Resetting Relewise configuration");
      self.configure.clear();
    }
    self.configure(configure)
  }

  /// Runs every callback and returns the resulting options tree.
  pub fn into_options(self) -> Result<RelewiseOptionsBuilder> {
    let mut options = RelewiseOptionsBuilder::new();
    for configure in self.configure {
      configure(&mut options)?;
    }
    Ok(options)
  }

  pub fn build(self) -> Result<ClientRegistry> {
    ClientRegistry::new(self.into_options()?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kind::ClientKind;
  use crate::source::DEFAULT_SECTION;
  use figment::providers::Format;
  use figment::providers::Json;
  use std::time::Duration;
  use uuid::Uuid;

  #[test]
  fn later_callbacks_override_earlier_ones() {
    let registry = Registration::new()
      .configure(|options| {
        options.global.dataset_id = Some(Uuid::new_v4());
        options.global.api_key = Some("first".into());
        options.global.timeout = Some(Duration::from_secs(30));
      })
      .configure(|options| options.global.api_key = Some("second".into()))
      .build()
      .unwrap();

    let tracker = registry.options(ClientKind::Tracker, None).unwrap();
    assert_eq!(tracker.api_key(), "second");
    assert_eq!(tracker.timeout(), Duration::from_secs(30));
  }

  #[test]
  fn reset_drops_earlier_callbacks() {
    let options = Registration::new()
      .configure(|options| options.global.timeout = Some(Duration::from_secs(30)))
      .configure_with_reset(true, |options| options.global.api_key = Some("k".into()))
      .into_options()
      .unwrap();

    assert_eq!(options.global.timeout, None);
    assert_eq!(options.global.api_key.as_deref(), Some("k"));
  }

  #[test]
  fn failing_callbacks_abort_the_build() {
    let err = Registration::new()
      .try_configure(|options| {
        options.named.try_add("a", |_| {})?;
        options.named.try_add("a", |_| {})?;
        Ok(())
      })
      .build()
      .unwrap_err();

    assert!(err.is_duplicate_name());
  }

  #[test]
  fn reads_from_configuration() {
    let source = Figment::from(Json::string(
      r#"{ "Relewise": { "DatasetId": "6d9361aa-a23d-4bf2-a818-5aba792e2102", "ApiKey": "k", "Timeout": "00:00:10" } }"#,
    ));

    let registry = Registration::from_configuration(source, DEFAULT_SECTION)
      .configure(|options| options.recommender.timeout = Some(Duration::from_secs(1)))
      .build()
      .unwrap();

    assert_eq!(registry.tracker(None).unwrap().timeout(), Duration::from_secs(10));
    assert_eq!(registry.recommender(None).unwrap().timeout(), Duration::from_secs(1));
  }

  #[test]
  fn empty_registration_registers_nothing() {
    let registry = Registration::new().build().unwrap();
    assert!(registry.default_kinds().is_empty());
    assert!(registry.tracker(None).unwrap_err().is_not_registered());
  }
}

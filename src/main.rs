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
use Commands::Check;
use Commands::Example;
use Commands::Names;
use Commands::Options;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use relewise_clients::cli::Cli;
use relewise_clients::cli::Commands;
use relewise_clients::cli::ExampleFormat;
use relewise_clients::client::Client;
use relewise_clients::duration::format_timeout;
use relewise_clients::kind::ClientKind;
use relewise_clients::logging::setup_tracing;
use relewise_clients::registration::Registration;
use relewise_clients::registry::ClientRegistry;
use relewise_clients::source::configuration_source;
use relewise_clients::source::example_json;
use relewise_clients::source::example_toml;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionsReport {
  kind: ClientKind,
  name: Option<String>,
  dataset_id: String,
  api_key: String,
  timeout: String,
  server_url: String,
}

#[derive(Debug, Serialize)]
struct CheckReport {
  defaults: Vec<ClientKind>,
  named: BTreeMap<String, Vec<ClientKind>>,
}

fn mask(api_key: &str) -> String {
  let visible: String = api_key.chars().take(3).collect();
  format!("{visible}***")
}

fn load(cli: &Cli) -> Result<ClientRegistry> {
  if let Some(path) = &cli.config {
    if !path.exists() {
      anyhow::bail!("Configuration file not found: {}", path.display());
    }
  }

  let source = configuration_source(cli.config.as_deref(), &cli.section);
  let registry = Registration::from_configuration(source, cli.section.clone())
    .build()
    .context("Failed to resolve Relewise clients")?;

  Ok(registry)
}

fn main() -> Result<()> {
  let _guard = setup_tracing()?;

  let cli = Cli::parse();
  let main_span = tracing::info_span!("relewise");
  let _enter = main_span.enter();

  match &cli.command {
    Options {
      kind,
      name,
      reveal_api_key,
    } => {
      let registry = load(&cli)?;
      let client = registry.client(*kind, name.as_deref())?;

      let report = OptionsReport {
        kind: *kind,
        name: name.clone(),
        dataset_id: client.dataset_id().to_string(),
        api_key: if *reveal_api_key {
          client.api_key().to_string()
        } else {
          mask(client.api_key())
        },
        timeout: format_timeout(client.timeout()),
        server_url: client.server_url().to_string(),
      };

      println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Names => {
      let registry = load(&cli)?;
      for name in registry.client_names() {
        println!("{name}");
      }
    }
    Check => {
      let registry = load(&cli)?;
      let mut named = BTreeMap::new();
      for name in registry.client_names() {
        let resolved = registry.named(name)?;
        let kinds: Vec<ClientKind> = ClientKind::ALL
          .into_iter()
          .filter(|kind| resolved.client(*kind).is_some())
          .collect();
        named.insert(name.to_string(), kinds);
      }

      let report = CheckReport {
        defaults: registry.default_kinds(),
        named,
      };

      tracing::info!("All configured Relewise clients resolved.");
      println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Example { format } => {
      let example = match format {
        ExampleFormat::Json => example_json(&cli.section)?,
        ExampleFormat::Toml => example_toml(&cli.section)?,
      };
      println!("{example}");
    }
  }

  Ok(())
}

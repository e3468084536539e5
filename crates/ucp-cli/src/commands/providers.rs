//! `providers` subcommands.

use std::io::Write;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{Value, json};
use ucp_llm::ProviderConfig;
use ucp_store::ProviderFilter;

use crate::app::App;
use crate::render;

#[derive(Subcommand, Debug)]
pub enum ProvidersCommand {
    /// Store a new provider configuration.
    Add(AddProvider),
    /// List stored configurations.
    List,
    /// Show one configuration.
    Show { name: String },
    /// Use this configuration when `run` is given no `--provider`.
    SetDefault { name: String },
    /// Delete a configuration.
    Remove { name: String },
}

#[derive(Args, Debug)]
pub struct AddProvider {
    /// Unique name.
    pub name: String,
    /// Endpoint root; requests go to `{base_url}/v1/chat/completions`.
    #[arg(long)]
    pub base_url: String,
    #[arg(long)]
    pub model: String,
    /// Sent as a bearer token.
    #[arg(long)]
    pub api_key: Option<String>,
    #[arg(long)]
    pub context_window: Option<u64>,
    #[arg(long)]
    pub max_tokens: Option<u64>,
    #[arg(long)]
    pub temperature: Option<f64>,
    /// USD per 1k prompt tokens.
    #[arg(long, default_value_t = 0.0)]
    pub cost_in: f64,
    /// USD per 1k completion tokens.
    #[arg(long, default_value_t = 0.0)]
    pub cost_out: f64,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Make this the default configuration.
    #[arg(long)]
    pub default: bool,
}

impl AddProvider {
    fn into_config(self) -> ProviderConfig {
        let mut config = ProviderConfig::new(self.name, self.base_url, self.model);
        config.api_key = self.api_key.filter(|k| !k.is_empty());
        config.cost_per_1k_input = self.cost_in;
        config.cost_per_1k_output = self.cost_out;
        if let Some(v) = self.context_window {
            config.context_window = v;
        }
        if let Some(v) = self.max_tokens {
            config.max_tokens = v;
        }
        if let Some(v) = self.temperature {
            config.temperature = v;
        }
        if let Some(v) = self.timeout_ms {
            config.timeout_ms = v;
        }
        config
    }
}

pub fn handle<W: Write>(app: &App, command: ProvidersCommand, out: &mut W) -> Result<()> {
    match command {
        ProvidersCommand::Add(args) => {
            let make_default = args.default;
            let config = args.into_config();
            config.validate().context("Invalid provider configuration")?;
            app.store.create_provider(&config)?;
            if make_default {
                app.store.set_default_provider(&config.id)?;
            }
            writeln!(out, "added {} ({})", config.name, config.id)?;
            Ok(())
        }
        ProvidersCommand::List => {
            let configs = app.store.list_providers(&ProviderFilter::default())?;
            if app.json {
                let redacted: Vec<Value> = configs.iter().map(redacted).collect();
                return render::json(out, &redacted);
            }
            for c in &configs {
                writeln!(
                    out,
                    "{} {:<16} {:<24} {}",
                    if c.is_default { "*" } else { " " },
                    c.name,
                    c.model,
                    c.base_url
                )?;
            }
            Ok(())
        }
        ProvidersCommand::Show { name } => {
            let config = by_name(app, &name)?;
            render::json(out, &redacted(&config))
        }
        ProvidersCommand::SetDefault { name } => {
            let config = by_name(app, &name)?;
            app.store.set_default_provider(&config.id)?;
            writeln!(out, "default provider is now {name}")?;
            Ok(())
        }
        ProvidersCommand::Remove { name } => {
            let config = by_name(app, &name)?;
            let _ = app.store.delete_provider(&config.id)?;
            writeln!(out, "removed {name}")?;
            Ok(())
        }
    }
}

fn by_name(app: &App, name: &str) -> Result<ProviderConfig> {
    app.store
        .get_provider_by_name(name)?
        .with_context(|| format!("No provider configuration named '{name}'"))
}

/// Configuration as JSON with the API key replaced.
fn redacted(config: &ProviderConfig) -> Value {
    let mut value = serde_json::to_value(config).unwrap_or(Value::Null);
    if let Some(key) = value.get_mut("api_key") {
        *key = json!(ucp_llm::REDACTED);
    }
    value
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ucp_store::Store;

    fn add(name: &str, default: bool) -> AddProvider {
        AddProvider {
            name: name.into(),
            base_url: "http://localhost:11434".into(),
            model: "llama3".into(),
            api_key: Some("sk-secret".into()),
            context_window: Some(8192),
            max_tokens: Some(1024),
            temperature: None,
            cost_in: 0.0,
            cost_out: 0.0,
            timeout_ms: None,
            default,
        }
    }

    #[test]
    fn add_and_make_default() {
        let app = App::with_store(Store::in_memory().unwrap(), false);
        handle(&app, ProvidersCommand::Add(add("local", false)), &mut Vec::new()).unwrap();
        handle(&app, ProvidersCommand::Add(add("backup", true)), &mut Vec::new()).unwrap();
        assert_eq!(app.store.default_provider().unwrap().unwrap().name, "backup");

        handle(&app, ProvidersCommand::SetDefault { name: "local".into() }, &mut Vec::new()).unwrap();
        assert_eq!(app.store.default_provider().unwrap().unwrap().name, "local");

        let mut buf = Vec::new();
        handle(&app, ProvidersCommand::List, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.lines().any(|l| l.starts_with("* local")));
    }

    #[test]
    fn invalid_config_is_not_stored() {
        let app = App::with_store(Store::in_memory().unwrap(), false);
        let mut args = add("bad", false);
        args.base_url = "ftp://example.com".into();
        assert!(handle(&app, ProvidersCommand::Add(args), &mut Vec::new()).is_err());
        assert!(app.store.get_provider_by_name("bad").unwrap().is_none());
    }

    #[test]
    fn show_never_prints_the_key() {
        let app = App::with_store(Store::in_memory().unwrap(), true);
        handle(&app, ProvidersCommand::Add(add("local", false)), &mut Vec::new()).unwrap();
        let mut buf = Vec::new();
        handle(&app, ProvidersCommand::Show { name: "local".into() }, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains("sk-secret"));
        assert!(text.contains(ucp_llm::REDACTED));
    }

    #[test]
    fn remove_unknown_fails() {
        let app = App::with_store(Store::in_memory().unwrap(), false);
        assert!(handle(&app, ProvidersCommand::Remove { name: "ghost".into() }, &mut Vec::new()).is_err());
    }
}

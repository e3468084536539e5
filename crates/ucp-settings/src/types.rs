//! Settings types.
//!
//! Every struct uses camelCase JSON keys and `#[serde(default)]` so a
//! partial settings file only overrides what it names.

use serde::{Deserialize, Serialize};
use ucp_core::constants;

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UcpSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Log output.
    pub logging: LoggingSettings,
    /// Persistence.
    pub store: StoreSettings,
    /// Compiler limits.
    pub compiler: CompilerSettings,
    /// Provider call handling.
    pub executor: ExecutorSettings,
    /// Provider used when no stored configuration is selected.
    pub provider: DefaultProviderSettings,
}

impl Default for UcpSettings {
    fn default() -> Self {
        Self {
            version: constants::VERSION.to_string(),
            name: constants::NAME.to_string(),
            logging: LoggingSettings::default(),
            store: StoreSettings::default(),
            compiler: CompilerSettings::default(),
            executor: ExecutorSettings::default(),
            provider: DefaultProviderSettings::default(),
        }
    }
}

impl UcpSettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(SettingsError::InvalidValue(format!(
                "provider.temperature must be within 0..=2, got {}",
                self.provider.temperature
            )));
        }
        if self.provider.cost_per_1k_input < 0.0 || self.provider.cost_per_1k_output < 0.0 {
            return Err(SettingsError::InvalidValue(
                "provider costs must not be negative".to_string(),
            ));
        }
        if self.compiler.system_reserve_tokens >= self.provider.context_window {
            return Err(SettingsError::InvalidValue(format!(
                "compiler.systemReserveTokens ({}) must be below provider.contextWindow ({})",
                self.compiler.system_reserve_tokens, self.provider.context_window
            )));
        }
        if self.store.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "store.maxConnections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Database path; relative paths resolve under `~/.ucp`.
    pub path: String,
    /// Connection pool size.
    pub max_connections: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: "ucp.db".to_string(),
            max_connections: 4,
        }
    }
}

/// Compiler limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerSettings {
    /// Longest accepted prompt, in characters.
    pub max_prompt_length: usize,
    /// Tokens held back from the context window when budgeting completions.
    pub system_reserve_tokens: u64,
    /// Seed the built-in dictionary and rules into an empty store.
    pub seed_defaults: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            max_prompt_length: constants::MAX_PROMPT_LENGTH,
            system_reserve_tokens: constants::SYSTEM_RESERVE_TOKENS,
            seed_defaults: true,
        }
    }
}

/// Provider call handling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutorSettings {
    /// Provider call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            timeout_ms: constants::DEFAULT_PROVIDER_TIMEOUT_MS,
        }
    }
}

/// Default provider, used when the store has no default configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultProviderSettings {
    /// Display name.
    pub name: String,
    /// Base URL of an OpenAI-compatible endpoint.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// API key; usually supplied through `UCP_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Context window in tokens.
    pub context_window: u64,
    /// Completion token cap.
    pub max_tokens: u64,
    /// Sampling temperature.
    pub temperature: f64,
    /// USD per 1000 prompt tokens.
    pub cost_per_1k_input: f64,
    /// USD per 1000 completion tokens.
    pub cost_per_1k_output: f64,
}

impl Default for DefaultProviderSettings {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            base_url: "https://api.openai.com/".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            context_window: constants::DEFAULT_CONTEXT_WINDOW,
            max_tokens: constants::DEFAULT_MAX_TOKENS,
            temperature: constants::DEFAULT_TEMPERATURE,
            cost_per_1k_input: 0.00015,
            cost_per_1k_output: 0.0006,
        }
    }
}

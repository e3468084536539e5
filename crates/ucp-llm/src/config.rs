//! Provider configuration.

use serde::{Deserialize, Serialize};
use ucp_core::ProviderConfigId;
use ucp_core::constants::{
    DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_TOKENS, DEFAULT_PROVIDER_TIMEOUT_MS, DEFAULT_TEMPERATURE,
};
use ucp_settings::DefaultProviderSettings;
use ucp_tokens::Pricing;

use crate::errors::ConfigError;

/// Wire protocol spoken by a provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// `POST {base}/v1/chat/completions`.
    #[default]
    OpenaiCompatible,
}

impl ProviderKind {
    /// Stored name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenaiCompatible => "openai-compatible",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai-compatible" => Ok(Self::OpenaiCompatible),
            other => Err(format!("unknown provider kind: {other}")),
        }
    }
}

/// Everything needed to call one provider.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identifier.
    pub id: ProviderConfigId,
    /// Display name.
    pub name: String,
    /// Wire protocol.
    #[serde(default)]
    pub kind: ProviderKind,
    /// Endpoint root, e.g. `https://api.openai.com/`.
    pub base_url: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Bearer key; local servers often need none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
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
    /// Call timeout in milliseconds.
    pub timeout_ms: u64,
    /// Used when a run names no provider.
    #[serde(default)]
    pub is_default: bool,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| crate::sanitize::REDACTED))
            .field("context_window", &self.context_window)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_ms", &self.timeout_ms)
            .field("is_default", &self.is_default)
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// New configuration with library defaults for everything but the
    /// endpoint and model.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: ProviderConfigId::new(),
            name: name.into(),
            kind: ProviderKind::default(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
            timeout_ms: DEFAULT_PROVIDER_TIMEOUT_MS,
            is_default: false,
        }
    }

    /// Configuration described by the settings file.
    pub fn from_settings(settings: &DefaultProviderSettings, timeout_ms: u64) -> Self {
        Self {
            api_key: settings.api_key.clone(),
            context_window: settings.context_window,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            cost_per_1k_input: settings.cost_per_1k_input,
            cost_per_1k_output: settings.cost_per_1k_output,
            timeout_ms,
            is_default: true,
            ..Self::new(&settings.name, &settings.base_url, &settings.model)
        }
    }

    /// Check every field before the configuration is used or stored.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        for (field, value) in [
            ("context_window", self.context_window),
            ("max_tokens", self.max_tokens),
            ("timeout_ms", self.timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if self.max_tokens > self.context_window {
            return Err(ConfigError::MaxTokensExceedWindow {
                max_tokens: self.max_tokens,
                context_window: self.context_window,
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Temperature(self.temperature));
        }
        for (field, value) in [
            ("cost_per_1k_input", self.cost_per_1k_input),
            ("cost_per_1k_output", self.cost_per_1k_output),
        ] {
            if value < 0.0 {
                return Err(ConfigError::NegativeCost { field });
            }
        }
        Ok(())
    }

    /// Prices used for cost accounting.
    pub fn pricing(&self) -> Pricing {
        Pricing {
            input_per_1k: self.cost_per_1k_input,
            output_per_1k: self.cost_per_1k_output,
        }
    }

    /// Full `chat/completions` URL.
    ///
    /// A `/v1/` segment is added when the base URL has none.
    pub fn completions_url(&self) -> String {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        if !base.contains("/v1/") {
            base.push_str("v1/");
        }
        base.push_str("chat/completions");
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid() -> ProviderConfig {
        ProviderConfig::new("local", "http://localhost:1234", "llama-3")
    }

    #[test]
    fn defaults_validate() {
        let c = valid();
        assert_eq!(c.context_window, 4096);
        assert_eq!(c.max_tokens, 1024);
        assert!((c.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(c.validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_fields() {
        let mut c = valid();
        c.name = "  ".into();
        assert_eq!(c.validate(), Err(ConfigError::EmptyName));

        let mut c = valid();
        c.base_url = "localhost:1234".into();
        assert_matches!(c.validate(), Err(ConfigError::InvalidBaseUrl { .. }));

        let mut c = valid();
        c.base_url = "ftp://example.com".into();
        assert_matches!(c.validate(), Err(ConfigError::InvalidBaseUrl { reason, .. }) if reason.contains("ftp"));

        let mut c = valid();
        c.timeout_ms = 0;
        assert_eq!(c.validate(), Err(ConfigError::Zero { field: "timeout_ms" }));

        let mut c = valid();
        c.max_tokens = 5000;
        assert_matches!(c.validate(), Err(ConfigError::MaxTokensExceedWindow { .. }));

        let mut c = valid();
        c.temperature = -0.1;
        assert_matches!(c.validate(), Err(ConfigError::Temperature(_)));

        let mut c = valid();
        c.cost_per_1k_output = -1.0;
        assert_eq!(c.validate(), Err(ConfigError::NegativeCost { field: "cost_per_1k_output" }));
    }

    #[test]
    fn completions_url_variants() {
        let mut c = valid();
        assert_eq!(c.completions_url(), "http://localhost:1234/v1/chat/completions");
        c.base_url = "https://api.openai.com/v1/".into();
        assert_eq!(c.completions_url(), "https://api.openai.com/v1/chat/completions");
        c.base_url = "https://proxy.example.com/v1".into();
        assert_eq!(c.completions_url(), "https://proxy.example.com/v1/chat/completions");
    }

    #[test]
    fn debug_hides_the_key() {
        let mut c = valid();
        c.api_key = Some("sk-live-123".into());
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-live-123"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn from_settings_is_default() {
        let settings = DefaultProviderSettings::default();
        let c = ProviderConfig::from_settings(&settings, 1500);
        assert!(c.is_default);
        assert_eq!(c.timeout_ms, 1500);
        assert_eq!(c.model, settings.model);
        assert_eq!(c.validate(), Ok(()));
    }

    #[test]
    fn kind_names() {
        assert_eq!(serde_json::to_string(&ProviderKind::OpenaiCompatible).unwrap(), "\"openai-compatible\"");
        assert_eq!("openai-compatible".parse::<ProviderKind>().unwrap(), ProviderKind::OpenaiCompatible);
    }
}

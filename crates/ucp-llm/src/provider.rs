//! # Provider Trait
//!
//! Core abstraction for model backends. A provider takes a serialized packet
//! plus a system context and returns text, optional usage, and the raw
//! response body for the ledger.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ucp_tokens::Usage;

use crate::config::{ProviderConfig, ProviderKind};
use crate::errors::{ConfigError, ProviderResult};
use crate::openai::OpenAiCompatProvider;

/// One provider call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Packet in wire syntax; sent as the user message.
    pub serialized_packet: String,
    /// Instructions derived from the packet; sent as the system message.
    pub system_context: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Completion token cap.
    pub max_tokens: u64,
}

/// A successful provider call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text.
    pub text: String,
    /// Counts reported by the provider, if any.
    pub usage: Option<Usage>,
    /// Time from send to parsed body.
    pub latency_ms: u64,
    /// Response body as received.
    pub raw: serde_json::Value,
}

/// Model backend.
///
/// Implementors must be `Send + Sync` for use across async tasks. A call
/// either returns a response or a classified [`ProviderError`](crate::ProviderError);
/// it is never retried here.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Display name of the backend.
    fn name(&self) -> &str;

    /// Model identifier.
    fn model(&self) -> &str;

    /// Send one request.
    async fn invoke(&self, request: &ProviderRequest) -> ProviderResult<ProviderResponse>;
}

/// Build the provider a configuration describes.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    config.validate()?;
    match config.kind {
        ProviderKind::OpenaiCompatible => Ok(Arc::new(OpenAiCompatProvider::new(config.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_validates_first() {
        let mut config = ProviderConfig::new("local", "http://localhost:1234", "llama-3");
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "local");
        assert_eq!(provider.model(), "llama-3");

        config.model = String::new();
        assert_eq!(create_provider(&config).err(), Some(ConfigError::EmptyModel));
    }
}

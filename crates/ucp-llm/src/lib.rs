//! # ucp-llm
//!
//! Language-model providers behind one request/response interface.
//!
//! - [`Provider`]: async trait every backend implements
//! - [`ProviderConfig`]: stored provider settings, validated before use
//! - [`OpenAiCompatProvider`]: `chat/completions` over HTTP via `reqwest`
//! - [`parse_api_error`]: error envelope parsing for non-2xx responses
//! - [`sanitize_response`]: redacts credentials before a response is recorded

#![deny(unsafe_code)]

pub mod config;
pub mod error_parsing;
pub mod errors;
pub mod openai;
pub mod provider;
pub mod sanitize;

pub use config::{ProviderConfig, ProviderKind};
pub use error_parsing::{ApiErrorInfo, parse_api_error};
pub use errors::{ConfigError, ProviderError, ProviderResult};
pub use openai::OpenAiCompatProvider;
pub use provider::{Provider, ProviderRequest, ProviderResponse, create_provider};
pub use sanitize::{REDACTED, sanitize_response};

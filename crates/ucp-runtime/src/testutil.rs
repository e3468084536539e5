//! Shared test utilities: a scripted provider and compiled sessions.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use ucp_compiler::{Catalog, CompileOptions, Compilation, Compiler};
use ucp_dictionary::Dictionary;
use ucp_ledger::{Session, SessionStatus};
use ucp_llm::{Provider, ProviderError, ProviderRequest, ProviderResponse, ProviderResult};
use ucp_rules::RuleEngine;
use ucp_tokens::Usage;

use crate::pipeline::record_compile;

enum Behavior {
    Reply { text: String, usage: Option<Usage> },
    Api { status: u16, message: String },
    Malformed(String),
    Hang,
}

/// Provider that answers every call the same way and remembers requests.
pub struct MockProvider {
    behavior: Behavior,
    raw: Value,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            raw: json!({"object": "chat.completion"}),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer with `text`.
    pub fn reply(text: &str, usage: Option<Usage>) -> Self {
        Self::with(Behavior::Reply {
            text: text.to_owned(),
            usage,
        })
    }

    /// Answer with a non-2xx status.
    pub fn api_error(status: u16, message: &str) -> Self {
        Self::with(Behavior::Api {
            status,
            message: message.to_owned(),
        })
    }

    /// Answer with an unusable body.
    pub fn malformed(message: &str) -> Self {
        Self::with(Behavior::Malformed(message.to_owned()))
    }

    /// Never answer.
    pub fn hang() -> Self {
        Self::with(Behavior::Hang)
    }

    /// Raw body returned with replies.
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    /// Number of calls received.
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Most recent request.
    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-1"
    }

    async fn invoke(&self, request: &ProviderRequest) -> ProviderResult<ProviderResponse> {
        self.requests.lock().push(request.clone());
        match &self.behavior {
            Behavior::Reply { text, usage } => Ok(ProviderResponse {
                text: text.clone(),
                usage: *usage,
                latency_ms: 5,
                raw: self.raw.clone(),
            }),
            Behavior::Api { status, message } => Err(ProviderError::Api {
                status: *status,
                message: message.clone(),
                code: None,
                retryable: *status >= 500,
            }),
            Behavior::Malformed(message) => Err(ProviderError::Malformed {
                message: message.clone(),
            }),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

/// Compiler over the built-in dictionary and rules.
pub fn test_compiler() -> Compiler {
    let catalog = Catalog::new(
        Dictionary::seeded("test").unwrap(),
        RuleEngine::with_defaults("test").unwrap(),
    );
    Compiler::new(Arc::new(catalog))
}

/// A session for `prompt` in `compiling` with its COMPILE hop recorded.
pub fn compiled_session(compiler: &Compiler, prompt: &str) -> (Session, Compilation) {
    let mut session = Session::new(prompt, None);
    session.transition(SessionStatus::Compiling).unwrap();
    let compilation = compiler.compile(prompt, &CompileOptions::default()).unwrap();
    record_compile(&mut session, &compilation, 1, 4096).unwrap();
    (session, compilation)
}

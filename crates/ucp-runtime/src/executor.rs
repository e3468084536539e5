//! Executor: sends a compiled packet to the provider and records the
//! exchange in the session ledger.
//!
//! ```text
//! compiling ─► running ─► PROVIDER_REQUEST ─► invoke ─┬─► PROVIDER_RESPONSE ─► EXECUTION ─► success
//!                                                      └─────────────────────► EXECUTION ─► error
//! ```
//!
//! The provider call is the only await point. It is bounded by the
//! configured timeout and the caller's cancellation token; whichever ends
//! it, the failure is written as the terminal EXECUTION hop so the ledger
//! shows the attempt.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use ucp_compiler::Compilation;
use ucp_ledger::{HopMetrics, HopType, Session, SessionStatus, append};
use ucp_llm::{Provider, ProviderConfig, ProviderError, ProviderRequest, ProviderResponse, sanitize_response};
use ucp_tokens::{Cost, Pricing, TokenMethod, Usage, calculate_cost, estimate};

use crate::context::build_system_context;
use crate::errors::{AuditAnchor, ExecutorError};

/// Provider-call limits and pricing.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutorConfig {
    /// Provider call timeout.
    pub timeout_ms: u64,
    /// Sampling temperature.
    pub temperature: f64,
    /// Provider context window, for context-pressure accounting.
    pub context_window: u64,
    /// Prices for cost accounting.
    pub pricing: Pricing,
}

impl From<&ProviderConfig> for ExecutorConfig {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            temperature: config.temperature,
            context_window: config.context_window,
            pricing: config.pricing(),
        }
    }
}

/// A completed execution.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    /// Provider text.
    pub output: String,
    /// Token counts for the exchange.
    pub usage: Usage,
    /// Where `usage` came from.
    pub token_method: TokenMethod,
    /// Priced exchange.
    pub cost: Cost,
    /// Measured provider latency.
    pub latency_ms: u64,
    /// The terminal EXECUTION hop.
    pub anchor: AuditAnchor,
}

/// Runs compiled sessions against one provider.
pub struct Executor {
    provider: Arc<dyn Provider>,
    config: ExecutorConfig,
}

impl Executor {
    /// Executor for `provider` under `config`.
    pub fn new(provider: Arc<dyn Provider>, config: ExecutorConfig) -> Self {
        Self { provider, config }
    }

    /// The provider.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Execute `compilation` for `session`.
    ///
    /// The session must be `compiling` with exactly one COMPILE hop. On
    /// return it is `success` or `error`; on error every hop written so far
    /// is kept and the error's anchor is the terminal EXECUTION hop.
    #[instrument(skip_all, fields(session_id = %session.session_id, provider = self.provider.name()))]
    pub async fn execute(
        &self,
        session: &mut Session,
        compilation: &Compilation,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        check_ready(session)?;
        session
            .transition(SessionStatus::Running)
            .map_err(|source| ExecutorError::Ledger {
                source,
                anchor: AuditAnchor::last_of(session),
            })?;

        let packet = &compilation.packet;
        let request = ProviderRequest {
            serialized_packet: compilation.wire.clone(),
            system_context: build_system_context(packet, &compilation.flags),
            temperature: self.config.temperature,
            max_tokens: compilation.token_budget,
        };
        let prompt_estimate = estimate(&request.system_context) + estimate(&request.serialized_packet);
        let _ = self.record(
            session,
            HopType::ProviderRequest,
            json!({
                "commandId": packet.command_id,
                "provider": self.provider.name(),
                "model": self.provider.model(),
                "serializedPacket": request.serialized_packet,
                "systemContext": request.system_context,
                "temperature": request.temperature,
                "maxTokens": request.max_tokens,
                "timeoutMs": self.config.timeout_ms,
            }),
            HopMetrics {
                token_count: prompt_estimate,
                token_method: TokenMethod::LocalEstimated,
                context_window: self.config.context_window,
                ..HopMetrics::default()
            },
        )?;

        let started = Instant::now();
        let result = self.invoke(&request, cancel).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => self.succeed(session, compilation, response, prompt_estimate, latency_ms),
            Err(error) => Err(self.fail(session, compilation, error, latency_ms)),
        }
    }

    async fn invoke(
        &self,
        request: &ProviderRequest,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, ProviderError> {
        let timeout_ms = self.config.timeout_ms;
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ProviderError::Cancelled),
            result = tokio::time::timeout(Duration::from_millis(timeout_ms), self.provider.invoke(request)) => {
                result.unwrap_or(Err(ProviderError::Timeout { timeout_ms }))
            }
        }
    }

    fn succeed(
        &self,
        session: &mut Session,
        compilation: &Compilation,
        response: ProviderResponse,
        prompt_estimate: u64,
        latency_ms: u64,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let (usage, token_method) = match response.usage {
            Some(usage) => (usage, TokenMethod::ProviderReported),
            None => (
                Usage {
                    prompt_tokens: prompt_estimate,
                    completion_tokens: estimate(&response.text),
                },
                TokenMethod::LocalEstimated,
            ),
        };
        let cost = calculate_cost(&usage, &self.config.pricing);
        let parse_valid = !response.text.trim().is_empty();

        let _ = self.record(
            session,
            HopType::ProviderResponse,
            json!({
                "text": response.text,
                "usage": usage,
                "tokenMethod": token_method,
                "reportedLatencyMs": response.latency_ms,
                "raw": sanitize_response(&response.raw),
            }),
            HopMetrics {
                token_count: usage.total(),
                token_method,
                latency_ms,
                context_window: self.config.context_window,
                parse_valid,
            },
        )?;
        let anchor = self.record(
            session,
            HopType::Execution,
            json!({
                "status": "success",
                "commandId": compilation.packet.command_id,
                "output": response.text,
                "usage": usage,
                "cost": cost,
                "latencyMs": latency_ms,
            }),
            HopMetrics {
                token_count: usage.completion_tokens,
                token_method,
                latency_ms,
                context_window: self.config.context_window,
                parse_valid,
            },
        )?;

        session
            .totals
            .record_exchange(usage, cost.total, latency_ms, self.config.context_window);
        session.final_output = Some(response.text.clone());
        session
            .transition(SessionStatus::Success)
            .map_err(|source| ExecutorError::Ledger {
                source,
                anchor: Some(anchor.clone()),
            })?;
        info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            method = %token_method,
            latency_ms,
            "execution succeeded"
        );

        Ok(ExecutionOutcome {
            output: response.text,
            usage,
            token_method,
            cost,
            latency_ms,
            anchor,
        })
    }

    fn fail(
        &self,
        session: &mut Session,
        compilation: &Compilation,
        error: ProviderError,
        latency_ms: u64,
    ) -> ExecutorError {
        warn!(category = error.category(), latency_ms, error = %error, "provider call failed");
        let recorded = self.record(
            session,
            HopType::Execution,
            json!({
                "status": "error",
                "commandId": compilation.packet.command_id,
                "error": error.to_string(),
                "category": error.category(),
                "latencyMs": latency_ms,
            }),
            HopMetrics {
                token_count: 0,
                token_method: TokenMethod::LocalEstimated,
                latency_ms,
                context_window: self.config.context_window,
                parse_valid: false,
            },
        );
        let anchor = match recorded {
            Ok(anchor) => anchor,
            Err(err) => return err,
        };
        if let Err(source) = session.fail(error.to_string()) {
            return ExecutorError::Ledger {
                source,
                anchor: Some(anchor),
            };
        }
        ExecutorError::from_provider(error, anchor)
    }

    fn record(
        &self,
        session: &mut Session,
        hop_type: HopType,
        payload: Value,
        metrics: HopMetrics,
    ) -> Result<AuditAnchor, ExecutorError> {
        let appended = append(session, hop_type, payload, metrics).map(AuditAnchor::of);
        appended.map_err(|source| ExecutorError::Ledger {
            source,
            anchor: AuditAnchor::last_of(session),
        })
    }
}

fn check_ready(session: &Session) -> Result<(), ExecutorError> {
    let reason = if session.status != SessionStatus::Compiling {
        Some(format!("session is {}, expected compiling", session.status))
    } else if session.hops.len() != 1 || session.hops_of(HopType::Compile).count() != 1 {
        Some(format!(
            "expected exactly one COMPILE hop, found {} hop(s)",
            session.hops.len()
        ))
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ExecutorError::Precondition {
            reason,
            anchor: AuditAnchor::last_of(session),
        }),
        None => Ok(()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Compile, execute and persist one prompt as a session.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use ucp_compiler::{Catalog, CompileOptions, Compilation, Compiler};
use ucp_core::{ProviderConfigId, SessionId};
use ucp_ledger::{HopMetrics, HopType, LedgerError, Session, SessionStatus, append};
use ucp_llm::{ConfigError, Provider, ProviderConfig, create_provider};
use ucp_settings::UcpSettings;
use ucp_store::Store;
use ucp_tokens::TokenMethod;

use crate::errors::{Result, RuntimeError};
use crate::executor::{ExecutionOutcome, Executor, ExecutorConfig};

/// Builds the provider for a configuration.
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig) -> std::result::Result<Arc<dyn Provider>, ConfigError> + Send + Sync>;

/// Compiler limits that do not depend on the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Longest accepted prompt, in characters.
    pub max_prompt_length: usize,
    /// Tokens held back from the context window.
    pub system_reserve_tokens: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let defaults = CompileOptions::default();
        Self {
            max_prompt_length: defaults.max_prompt_length,
            system_reserve_tokens: defaults.system_reserve_tokens,
        }
    }
}

/// What one run produced.
///
/// The session is always persisted before a report is returned, whether
/// or not execution succeeded.
#[derive(Debug)]
pub struct RunReport {
    /// The session, in its terminal state.
    pub session: Session,
    /// The compile, when it succeeded.
    pub compilation: Option<Compilation>,
    /// Execution result, or why the session ended in `error`.
    pub outcome: std::result::Result<ExecutionOutcome, RuntimeError>,
}

impl RunReport {
    /// Whether the session ended in `success`.
    pub fn is_success(&self) -> bool {
        self.session.status == SessionStatus::Success
    }
}

/// Drives sessions from prompt to stored ledger.
pub struct Pipeline {
    compiler: Arc<Compiler>,
    store: Arc<Store>,
    options: PipelineOptions,
    factory: ProviderFactory,
    fallback: Option<ProviderConfig>,
}

impl Pipeline {
    /// Pipeline over `compiler` persisting to `store`.
    pub fn new(compiler: Arc<Compiler>, store: Arc<Store>, options: PipelineOptions) -> Self {
        Self {
            compiler,
            store,
            options,
            factory: Arc::new(create_provider),
            fallback: None,
        }
    }

    /// Pipeline built from settings: the catalog comes from the store
    /// (seeded when configured) and the settings provider becomes the
    /// fallback configuration.
    pub fn from_settings(settings: &UcpSettings, store: Arc<Store>) -> Result<Self> {
        let (dictionary, rules) = store.load_catalog(settings.compiler.seed_defaults)?;
        let compiler = Arc::new(Compiler::new(Arc::new(Catalog::new(dictionary, rules))));
        let options = PipelineOptions {
            max_prompt_length: settings.compiler.max_prompt_length,
            system_reserve_tokens: settings.compiler.system_reserve_tokens,
        };
        let fallback = ProviderConfig::from_settings(&settings.provider, settings.executor.timeout_ms);
        Ok(Self::new(compiler, store, options).with_fallback_provider(fallback))
    }

    /// Replace how providers are built from configurations.
    #[must_use]
    pub fn with_provider_factory(mut self, factory: ProviderFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Configuration used when no stored configuration applies.
    #[must_use]
    pub fn with_fallback_provider(mut self, config: ProviderConfig) -> Self {
        self.fallback = Some(config);
        self
    }

    /// The compiler.
    pub fn compiler(&self) -> &Arc<Compiler> {
        &self.compiler
    }

    /// The store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Compile limits for `config`, or library defaults for the window.
    pub fn compile_options(&self, config: Option<&ProviderConfig>) -> CompileOptions {
        let defaults = CompileOptions::default();
        CompileOptions {
            max_prompt_length: self.options.max_prompt_length,
            context_window: config.map_or(defaults.context_window, |c| c.context_window),
            max_tokens: config.map_or(defaults.max_tokens, |c| c.max_tokens),
            system_reserve_tokens: self.options.system_reserve_tokens,
        }
    }

    /// Compile without creating a session.
    pub fn compile_only(&self, raw_prompt: &str, config: Option<&ProviderConfig>) -> Result<Compilation> {
        Ok(self.compiler.compile(raw_prompt, &self.compile_options(config))?)
    }

    /// Configuration a session refers to: the stored one, the fallback if
    /// the ID is the fallback's, else the stored default, else the fallback.
    pub fn resolve_provider(&self, id: Option<&ProviderConfigId>) -> Result<ProviderConfig> {
        if let Some(id) = id {
            if let Some(config) = self.store.get_provider(id)? {
                return Ok(config);
            }
            return match &self.fallback {
                Some(fallback) if &fallback.id == id => Ok(fallback.clone()),
                _ => Err(RuntimeError::ProviderNotFound(id.to_string())),
            };
        }
        if let Some(config) = self.store.default_provider()? {
            return Ok(config);
        }
        self.fallback
            .clone()
            .ok_or_else(|| RuntimeError::ProviderNotFound("default".into()))
    }

    /// Run `raw_prompt` as a new session against `config`.
    ///
    /// An invalid configuration is rejected before the session exists.
    pub async fn run(
        &self,
        raw_prompt: &str,
        config: &ProviderConfig,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let provider = self.build_provider(config)?;
        let session = Session::new(raw_prompt, Some(config.id.clone()));
        self.drive(session, config, provider, cancel).await
    }

    /// Re-run a finished session as a new one. The original is not changed.
    ///
    /// The original's chain must verify, so a rewritten prompt is never re-run.
    #[instrument(skip(self, cancel))]
    pub async fn replay(&self, session_id: &SessionId, cancel: &CancellationToken) -> Result<RunReport> {
        let original = self.store.require_session(session_id)?;
        ucp_ledger::verify_session(&original).map_err(LedgerError::from)?;
        let config = self.resolve_provider(original.provider_config_ref.as_ref())?;
        let provider = self.build_provider(&config)?;
        let session = original.replay()?;
        self.drive(session, &config, provider, cancel).await
    }

    fn build_provider(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
        config.validate()?;
        Ok((self.factory)(config)?)
    }

    #[instrument(skip_all, fields(session_id = %session.session_id, provider = %config.name))]
    async fn drive(
        &self,
        mut session: Session,
        config: &ProviderConfig,
        provider: Arc<dyn Provider>,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        session.transition(SessionStatus::Compiling)?;
        let started = Instant::now();
        // Compiles of the same prompt serialize on the cache slot lock.
        let compiled = tokio::task::spawn_blocking({
            let compiler = Arc::clone(&self.compiler);
            let prompt = session.raw_prompt.clone();
            let options = self.compile_options(Some(config));
            move || compiler.compile(&prompt, &options)
        })
        .await?;
        let compilation = match compiled {
            Ok(compilation) => compilation,
            Err(error) => {
                warn!(error = %error, "compile failed");
                session.fail(error.to_string())?;
                self.store.save_session(&session)?;
                return Ok(RunReport {
                    session,
                    compilation: None,
                    outcome: Err(error.into()),
                });
            }
        };
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        record_compile(&mut session, &compilation, latency_ms, config.context_window)?;
        self.store.save_session(&session)?;

        let executor = Executor::new(provider, ExecutorConfig::from(config));
        let outcome = executor
            .execute(&mut session, &compilation, cancel)
            .await
            .map_err(RuntimeError::from);
        self.store.save_session(&session)?;
        info!(status = %session.status, hops = session.hops.len(), "session stored");

        Ok(RunReport {
            session,
            compilation: Some(compilation),
            outcome,
        })
    }
}

/// Append the COMPILE hop for `compilation`. The ledger adds the prompt digest.
pub(crate) fn record_compile(
    session: &mut Session,
    compilation: &Compilation,
    latency_ms: u64,
    context_window: u64,
) -> std::result::Result<(), LedgerError> {
    let payload = json!({
        "packet": compilation.packet,
        "wire": compilation.wire,
        "cacheStatus": compilation.cache_status,
        "compression": compilation.compression,
        "encoderTokens": compilation.encoder_tokens,
        "savingsPct": compilation.savings_pct,
        "tokenBudget": compilation.token_budget,
        "flags": compilation.flags,
    });
    let metrics = HopMetrics {
        token_count: compilation.compression.compiled_tokens,
        token_method: TokenMethod::LocalEstimated,
        latency_ms,
        context_window,
        parse_valid: true,
    };
    append(session, HopType::Compile, payload, metrics).map(|_| ())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

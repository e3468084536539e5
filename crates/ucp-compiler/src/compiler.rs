//! Prompt compilation.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};
use ucp_core::constants::{DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_TOKENS, MAX_PROMPT_LENGTH, SYSTEM_RESERVE_TOKENS};
use ucp_dictionary::extract_parameters;
use ucp_protocol::{ActionKind, CacheKey, Packet, fingerprint};
use ucp_rules::{Draft, RuleFlag};
use ucp_tokens::{CompressionStats, estimate, token_budget};

use crate::cache::{CacheStatus, PacketCache};
use crate::catalog::{Catalog, CatalogView};
use crate::errors::{CompileError, Result};
use crate::fallback::strip_fillers;

/// Limits applied to one compile.
#[derive(Clone, Debug, PartialEq)]
pub struct CompileOptions {
    /// Longest accepted prompt, in characters.
    pub max_prompt_length: usize,
    /// Provider context window, for the completion budget.
    pub context_window: u64,
    /// Provider completion cap.
    pub max_tokens: u64,
    /// Tokens held back for the system context.
    pub system_reserve_tokens: u64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_prompt_length: MAX_PROMPT_LENGTH,
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_reserve_tokens: SYSTEM_RESERVE_TOKENS,
        }
    }
}

/// Report of one compile.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compilation {
    /// The packet, new or cached.
    pub packet: Packet,
    /// Whether the cache served it.
    pub cache_status: CacheStatus,
    /// Wire encoding of the packet.
    pub wire: String,
    /// Raw prompt against wire form.
    pub compression: CompressionStats,
    /// Estimated tokens spent encoding; zero on a hit.
    pub encoder_tokens: u64,
    /// Savings reported to the caller; 100 on a hit.
    pub savings_pct: f64,
    /// Completion budget for the provider call.
    pub token_budget: u64,
    /// Warnings raised by validation and safety rules.
    pub flags: Vec<RuleFlag>,
}

impl Compilation {
    /// Whether the prompt fell back to the generic REQUEST action.
    pub fn is_fallback(&self) -> bool {
        self.packet.action.kind == ActionKind::Request
    }
}

/// Compiler bound to a catalog, with its own packet cache.
#[derive(Debug)]
pub struct Compiler {
    catalog: Arc<Catalog>,
    cache: PacketCache,
}

impl Compiler {
    /// Compiler over `catalog` with an empty cache.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            cache: PacketCache::new(),
        }
    }

    /// The catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The packet cache.
    pub fn cache(&self) -> &PacketCache {
        &self.cache
    }

    /// Compile `raw_prompt`, serving from the cache when possible.
    #[instrument(skip_all, fields(len = raw_prompt.len()))]
    pub fn compile(&self, raw_prompt: &str, options: &CompileOptions) -> Result<Compilation> {
        let len = raw_prompt.chars().count();
        if len > options.max_prompt_length {
            return Err(CompileError::PromptTooLong {
                len,
                max: options.max_prompt_length,
            });
        }
        let input = raw_prompt.trim();
        let key = fingerprint(input);

        let view = self.catalog.read();
        let cached = self
            .cache
            .get_or_compile(&key, view.generation(), || build(&view, input, &key))?;
        drop(view);

        let wire = cached.packet.to_wire();
        let compression = CompressionStats::measure(input, &wire);
        let (encoder_tokens, savings_pct) = match cached.status {
            CacheStatus::Hit => (0, 100.0),
            CacheStatus::Miss => (estimate(&wire), compression.savings_pct),
        };
        let token_budget = token_budget(
            options.context_window,
            compression.compiled_tokens,
            options.system_reserve_tokens,
            options.max_tokens,
        );
        debug!(
            key = key.short(),
            action = %cached.packet.action.kind,
            status = ?cached.status,
            saved = compression.saved_tokens,
            "prompt compiled"
        );

        Ok(Compilation {
            packet: cached.packet,
            cache_status: cached.status,
            wire,
            compression,
            encoder_tokens,
            savings_pct,
            token_budget,
            flags: cached.flags,
        })
    }
}

/// Cache-miss path: rules, dictionary, packet.
fn build(view: &CatalogView<'_>, input: &str, key: &CacheKey) -> Result<(Packet, Vec<RuleFlag>)> {
    let normalized = view.rules.normalize(input);

    let draft = match view.dictionary.lookup(&normalized) {
        Some(m) if !m.remainder.is_empty() => {
            let parameters = extract_parameters(m.entry.body(), &normalized);
            Draft::new(m.entry.body().action, parameters, m.remainder)
        }
        matched => {
            if let Some(m) = matched {
                debug!(command = m.entry.command_name(), "empty remainder, using REQUEST");
            }
            let data = strip_fillers(&normalized);
            if data.is_empty() {
                return Err(CompileError::EmptyPayload);
            }
            Draft::new(ActionKind::Request, Vec::new(), data)
        }
    };

    let routed = view.rules.route(draft)?;
    let mut flags = routed.flags;
    let gated = view.rules.gate(routed.subject)?;
    flags.extend(gated.flags);

    let draft = gated.subject;
    if draft.data.trim().is_empty() {
        return Err(CompileError::EmptyPayload);
    }
    let packet = Packet::new(draft.action, draft.parameters, draft.data, key.clone());
    Ok((packet, flags))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

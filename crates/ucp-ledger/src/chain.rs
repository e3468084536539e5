//! Hash chain: append and verify.

use tracing::debug;
use ucp_core::constants::GENESIS_HASH;
use ucp_core::hash::{sha256_hex, sha256_hex_parts};
use ucp_core::text::truncate_str;

use serde_json::Value;

use crate::errors::{LedgerError, LedgerIntegrityError, Result};
use crate::hop::{Hop, HopMetrics, HopType};
use crate::scoring::score_hop;
use crate::session::{Session, SessionStatus};

/// SHA-256 of the compact JSON encoding of `payload`.
pub fn payload_digest(payload: &serde_json::Value) -> String {
    sha256_hex(payload.to_string())
}

/// Key under which a COMPILE hop records the digest of the session prompt.
pub const PROMPT_DIGEST_KEY: &str = "promptDigest";

/// SHA-256 of a raw prompt, as bound into the COMPILE hop.
pub fn prompt_digest(raw_prompt: &str) -> String {
    sha256_hex(raw_prompt)
}

/// Add the prompt digest to a COMPILE payload. Non-object payloads are
/// wrapped under `value`.
fn bind_prompt(payload: Value, raw_prompt: &str) -> Value {
    let mut map = match payload {
        Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            let _ = map.insert("value".to_owned(), other);
            map
        }
    };
    let _ = map.insert(PROMPT_DIGEST_KEY.to_owned(), Value::String(prompt_digest(raw_prompt)));
    Value::Object(map)
}

/// `SHA256(prev_hash ‖ payload_digest ‖ sequence_number ‖ hop_type)`.
pub fn hash_hop(prev_hash: &str, payload_digest: &str, sequence_number: u64, hop_type: HopType) -> String {
    let seq = sequence_number.to_string();
    sha256_hex_parts(&[
        prev_hash.as_bytes(),
        payload_digest.as_bytes(),
        seq.as_bytes(),
        hop_type.as_str().as_bytes(),
    ])
}

/// Append a hop and advance `chain_hash`.
///
/// Hops follow the owning stage: COMPILE once while compiling, then while
/// running PROVIDER_REQUEST, PROVIDER_RESPONSE and a single EXECUTION, which
/// may follow the request directly when the provider call failed.
///
/// The COMPILE payload gains a [`PROMPT_DIGEST_KEY`] entry binding the
/// session's `raw_prompt` into the chain.
pub fn append<'a>(
    session: &'a mut Session,
    hop_type: HopType,
    payload: serde_json::Value,
    metrics: HopMetrics,
) -> Result<&'a Hop> {
    let last = session.last_hop().map(|h| h.hop_type);
    let in_order = match hop_type {
        HopType::Compile => session.status == SessionStatus::Compiling && last.is_none(),
        HopType::ProviderRequest => session.status == SessionStatus::Running && last == Some(HopType::Compile),
        HopType::ProviderResponse => {
            session.status == SessionStatus::Running && last == Some(HopType::ProviderRequest)
        }
        HopType::Execution => {
            session.status == SessionStatus::Running
                && matches!(last, Some(HopType::ProviderRequest | HopType::ProviderResponse))
        }
    };
    if !in_order {
        return Err(LedgerError::OutOfOrder {
            hop_type,
            status: session.status,
            last,
        });
    }

    let payload = match hop_type {
        HopType::Compile => bind_prompt(payload, &session.raw_prompt),
        _ => payload,
    };
    let sequence_number = session.hops.len() as u64 + 1;
    let prev_hash = session.chain_hash.clone();
    let payload_digest = payload_digest(&payload);
    let hash = hash_hop(&prev_hash, &payload_digest, sequence_number, hop_type);
    let score = score_hop(&metrics).score;

    debug!(
        session_id = %session.session_id,
        sequence_number,
        %hop_type,
        hash = truncate_str(&hash, 12),
        "hop appended"
    );
    session.chain_hash.clone_from(&hash);
    session.hops.push(Hop {
        sequence_number,
        hop_type,
        payload,
        payload_digest,
        token_count: metrics.token_count,
        token_method: metrics.token_method,
        latency_ms: metrics.latency_ms,
        prev_hash,
        hash,
        score,
        timestamp: chrono::Utc::now().to_rfc3339(),
    });
    session.touch();
    let idx = session.hops.len() - 1;
    Ok(&session.hops[idx])
}

/// Recompute a hop sequence from genesis and return its head hash.
pub fn verify_chain(hops: &[Hop]) -> std::result::Result<String, LedgerIntegrityError> {
    let mut prev = GENESIS_HASH.to_owned();
    for (idx, hop) in hops.iter().enumerate() {
        let expected = idx as u64 + 1;
        if hop.sequence_number != expected {
            return Err(LedgerIntegrityError::SequenceGap {
                expected,
                found: hop.sequence_number,
            });
        }
        let sequence_number = hop.sequence_number;
        if hop.prev_hash != prev {
            return Err(LedgerIntegrityError::BrokenLink { sequence_number });
        }
        if payload_digest(&hop.payload) != hop.payload_digest {
            return Err(LedgerIntegrityError::DigestMismatch { sequence_number });
        }
        if hash_hop(&prev, &hop.payload_digest, sequence_number, hop.hop_type) != hop.hash {
            return Err(LedgerIntegrityError::HashMismatch { sequence_number });
        }
        prev.clone_from(&hop.hash);
    }
    Ok(prev)
}

/// Check that the first hop recorded the digest of `raw_prompt`.
///
/// A chain with no hops has nothing to check against.
pub fn verify_prompt(raw_prompt: &str, hops: &[Hop]) -> std::result::Result<(), LedgerIntegrityError> {
    let Some(first) = hops.first() else {
        return Ok(());
    };
    let recorded = first.payload.get(PROMPT_DIGEST_KEY).and_then(Value::as_str);
    if recorded != Some(prompt_digest(raw_prompt).as_str()) {
        return Err(LedgerIntegrityError::PromptMismatch);
    }
    Ok(())
}

/// Verify a session's hops, that `chain_hash` is their head and that the
/// chain was recorded for `raw_prompt`.
pub fn verify_session(session: &Session) -> std::result::Result<(), LedgerIntegrityError> {
    let computed = verify_chain(&session.hops)?;
    if computed != session.chain_hash {
        return Err(LedgerIntegrityError::ChainHashMismatch {
            recorded: session.chain_hash.clone(),
            computed,
        });
    }
    verify_prompt(&session.raw_prompt, &session.hops)
}

/// Whether the session's chain is intact.
pub fn verify(session: &Session) -> bool {
    verify_session(session).is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

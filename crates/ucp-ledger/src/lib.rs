//! # ucp-ledger
//!
//! Tamper-evident record of a session's compile and execution steps.
//!
//! Each [`Hop`] stores its payload, the payload's SHA-256 digest and
//! `hash = SHA256(prev_hash ‖ payload_digest ‖ sequence_number ‖ hop_type)`.
//! The first hop chains from [`GENESIS_HASH`](ucp_core::constants::GENESIS_HASH),
//! so changing any recorded payload breaks every later hash.
//!
//! - **Chain**: [`append`], [`verify`], [`verify_chain`]
//! - **Sessions**: [`Session`] and its [`SessionStatus`] state machine, [`Session::replay`]
//! - **Export**: [`export`] / [`verify_export`] for offline audit
//! - **Scoring**: [`score_hop`] grades token efficiency, latency and context pressure

#![deny(unsafe_code)]

pub mod chain;
pub mod errors;
pub mod export;
pub mod hop;
pub mod scoring;
pub mod session;

pub use chain::{
    PROMPT_DIGEST_KEY, append, hash_hop, payload_digest, prompt_digest, verify, verify_chain, verify_prompt, verify_session,
};
pub use errors::{LedgerError, LedgerIntegrityError, Result};
pub use export::{AuditExport, VerificationStatus, export, verify_export};
pub use hop::{Hop, HopMetrics, HopType};
pub use scoring::{HopScore, score_hop};
pub use session::{Session, SessionStatus};

//! # ucp-core
//!
//! Foundation types and utilities shared by every UCP crate.
//!
//! - **Branded IDs**: `SessionId`, `CommandId`, `EntryId`, `RuleId`,
//!   `ProviderConfigId` as newtypes for type safety
//! - **Constants**: protocol version, genesis hash, compiler and provider defaults
//! - **Hashing**: SHA-256 hex digests used by cache fingerprints and the hop chain
//! - **Audit trails**: versioned edit history with per-version snapshots
//! - **Text**: case-insensitive search that maps back to original byte offsets
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod audit;
pub mod constants;
pub mod hash;
pub mod ids;
pub mod logging;
pub mod text;

pub use audit::{AuditAction, AuditRecord, AuditTrail, Revisable, Versioned};
pub use hash::sha256_hex;
pub use ids::{CommandId, EntryId, ProviderConfigId, RuleId, SessionId};

//! # ucp-runtime
//!
//! Execution of compiled packets and the session pipeline.
//!
//! - **Executor**: provider call under timeout and cancellation; records
//!   PROVIDER_REQUEST, PROVIDER_RESPONSE and the terminal EXECUTION hop
//! - **Context**: system instructions derived from a packet
//! - **Pipeline**: config check → session → compile (COMPILE hop) →
//!   execute → persist; replay of finished sessions; dry-run compiles
//!
//! ## Crate Position
//!
//! Aggregation layer. Depends on: ucp-compiler, ucp-ledger, ucp-llm,
//! ucp-store. Depended on by: ucp-cli.

#![deny(unsafe_code)]

pub mod context;
pub mod errors;
pub mod executor;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod testutil;

pub use context::build_system_context;
pub use errors::{AuditAnchor, ExecutorError, Result, RuntimeError};
pub use executor::{ExecutionOutcome, Executor, ExecutorConfig};
pub use pipeline::{Pipeline, PipelineOptions, ProviderFactory, RunReport};

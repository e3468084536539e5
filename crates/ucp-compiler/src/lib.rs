//! # ucp-compiler
//!
//! Turns a natural-language prompt into a [`Packet`](ucp_protocol::Packet).
//!
//! ```text
//! prompt ──► length check ──► fingerprint ──► cache ──hit──► packet
//!                                              │
//!                                             miss
//!                                              ▼
//!   normalization rules ─► dictionary lookup ─► parameter extraction
//!   ─► routing/transformation rules ─► packet ─► validation/safety rules
//! ```
//!
//! The [`Catalog`] owns the dictionary and rules and exposes a generation
//! number; cached packets compiled under an older generation are recompiled.
//! Compiles of the same fingerprint are serialized so each key is compiled
//! at most once per generation.

#![deny(unsafe_code)]

pub mod cache;
pub mod catalog;
pub mod compiler;
pub mod errors;
pub mod fallback;

pub use cache::{CacheEntry, CacheStats, CacheStatus, Cached, PacketCache};
pub use catalog::{Catalog, CatalogView};
pub use compiler::{CompileOptions, Compilation, Compiler};
pub use errors::{CompileError, Result};
pub use fallback::strip_fillers;

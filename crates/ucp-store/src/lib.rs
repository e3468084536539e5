//! # ucp-store
//!
//! `SQLite` persistence for the UCP catalog and ledger.
//!
//! - [`Store`]: pooled, write-serialized facade used by the runtime and CLI
//! - [`sqlite::repositories`]: stateless repositories for dictionary
//!   entries, rules, provider configurations and sessions with their hops
//! - [`sqlite::migrations`]: embedded, version-tracked schema
//!
//! Stored hops are append-only; re-saving a session never rewrites them.

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod store;

pub use errors::{Result, StoreError};
pub use sqlite::connection::ConnectionConfig;
pub use sqlite::repositories::dictionary::{DictionaryRepo, EntryFilter, EntryOrder};
pub use sqlite::repositories::provider::{ProviderFilter, ProviderOrder, ProviderRepo};
pub use sqlite::repositories::rule::{RuleFilter, RuleOrder, RuleRepo};
pub use sqlite::repositories::session::{
    SessionFilter, SessionOrder, SessionRepo, SessionStats, SessionSummary,
};
pub use store::{SeedReport, Store};

//! # ucp-dictionary
//!
//! The command dictionary maps natural-language trigger keywords to
//! [`ActionKind`](ucp_protocol::ActionKind)s and modifier phrases to
//! canonical [`ParamToken`](ucp_protocol::ParamToken)s.
//!
//! Lookup is deterministic: entries are tried in insertion order, keywords in
//! their listed order, and the first case-insensitive substring hit wins.
//! Entries are edited through versioned revisions with an audit trail and
//! are archived rather than deleted.

#![deny(unsafe_code)]

pub mod dictionary;
pub mod entry;
pub mod errors;
pub mod remainder;
pub mod seed;

pub use dictionary::{Dictionary, DictionaryMatch, extract_parameters};
pub use entry::{DictionaryEntry, EntryBody, ParamMapping};
pub use errors::{DictionaryError, Result};
pub use remainder::derive_remainder;
pub use seed::default_entries;

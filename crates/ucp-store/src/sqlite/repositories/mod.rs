//! Repository implementations for `SQLite` database operations.
//!
//! Each repository is a stateless struct whose methods take a `&Connection`
//! parameter, so the same code runs against a pooled connection or inside
//! a transaction.

pub mod dictionary;
pub mod provider;
pub mod rule;
pub mod session;

//! # ucp-rules
//!
//! Ordered condition/action rules applied around compilation.
//!
//! | Stage | Rule types | Subject |
//! |---|---|---|
//! | [`Stage::Input`] | normalization | raw prompt text |
//! | [`Stage::Route`] | routing, then transformation | draft after dictionary match |
//! | [`Stage::Gate`] | validation, then safety | assembled draft; may reject |
//!
//! Within a rule type, rules run in ascending priority (ties broken by
//! name). A rule whose condition does not hold is a no-op. Conditions and
//! actions are typed and compiled when a rule is loaded, so malformed rules
//! are refused up front instead of failing mid-pipeline.

#![deny(unsafe_code)]

mod compiled;
pub mod defaults;
pub mod engine;
pub mod errors;
pub mod types;

pub use defaults::default_rules;
pub use engine::{Draft, Evaluation, RuleEngine, RuleFlag, Stage, Subject};
pub use errors::{Result, RuleError, RuleRejected};
pub use types::{Condition, Rule, RuleAction, RuleBody, RuleType};

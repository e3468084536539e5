//! Dictionary entries.

use serde::{Deserialize, Serialize};
use ucp_core::audit::{Revisable, Versioned};
use ucp_core::EntryId;
use ucp_protocol::{ActionKind, ParamToken};

use crate::errors::{DictionaryError, Result};

/// A modifier phrase and the token it emits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamMapping {
    /// Lower-case phrase searched for in the input.
    pub phrase: String,
    /// Token emitted when the phrase occurs.
    pub token: ParamToken,
}

/// The editable part of an entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryBody {
    /// Unique name, e.g. `summarize`.
    pub command_name: String,
    /// Action the entry compiles to.
    pub action: ActionKind,
    /// Free-form grouping label.
    pub category: String,
    /// Lower-case keywords, tried in order.
    pub trigger_keywords: Vec<String>,
    /// Phrase mappings, emitted in this order.
    pub parameter_map: Vec<ParamMapping>,
}

impl EntryBody {
    /// Build a body, lower-casing keywords and phrases and dropping
    /// duplicates while keeping first-seen order.
    pub fn new(
        command_name: &str,
        action: ActionKind,
        category: &str,
        trigger_keywords: &[&str],
        parameter_map: &[(&str, &str)],
    ) -> Result<Self> {
        let mut keywords: Vec<String> = Vec::with_capacity(trigger_keywords.len());
        for kw in trigger_keywords {
            let kw = kw.trim().to_lowercase();
            if !keywords.contains(&kw) {
                keywords.push(kw);
            }
        }
        let mut mappings: Vec<ParamMapping> = Vec::with_capacity(parameter_map.len());
        for (phrase, token) in parameter_map {
            let phrase = phrase.trim().to_lowercase();
            if mappings.iter().any(|m| m.phrase == phrase) {
                continue;
            }
            mappings.push(ParamMapping {
                phrase,
                token: token.parse()?,
            });
        }
        let body = Self {
            command_name: command_name.trim().to_owned(),
            action,
            category: category.trim().to_owned(),
            trigger_keywords: keywords,
            parameter_map: mappings,
        };
        body.validate()?;
        Ok(body)
    }

    /// Check the body against its action's parameter schema.
    pub fn validate(&self) -> Result<()> {
        if self.command_name.is_empty() {
            return Err(DictionaryError::EmptyName);
        }
        if self.action == ActionKind::Request {
            return Err(DictionaryError::ReservedAction(self.command_name.clone()));
        }
        if self.trigger_keywords.is_empty() {
            return Err(DictionaryError::NoKeywords(self.command_name.clone()));
        }
        let blank_keyword = self.trigger_keywords.iter().any(|k| k.trim().is_empty());
        let blank_phrase = self.parameter_map.iter().any(|m| m.phrase.trim().is_empty());
        if blank_keyword || blank_phrase {
            return Err(DictionaryError::EmptyPhrase(self.command_name.clone()));
        }
        for mapping in &self.parameter_map {
            if !self.action.accepts(mapping.token.key()) {
                return Err(DictionaryError::ParamNotInSchema {
                    command: self.command_name.clone(),
                    token: mapping.token.to_string(),
                    action: self.action.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Revisable for EntryBody {
    fn changed_fields(&self, next: &Self) -> Vec<String> {
        let mut changed = Vec::new();
        if self.command_name != next.command_name {
            changed.push("command_name".to_owned());
        }
        if self.action != next.action {
            changed.push("action".to_owned());
        }
        if self.category != next.category {
            changed.push("category".to_owned());
        }
        if self.trigger_keywords != next.trigger_keywords {
            changed.push("trigger_keywords".to_owned());
        }
        if self.parameter_map != next.parameter_map {
            changed.push("parameter_map".to_owned());
        }
        changed
    }
}

/// A stored dictionary entry with its history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Stable identifier.
    pub id: EntryId,
    /// Body, version counter, archive flag and audit trail.
    #[serde(flatten)]
    pub record: Versioned<EntryBody>,
}

impl DictionaryEntry {
    /// Create version 1 of an entry.
    pub fn create(body: EntryBody, actor: &str) -> Result<Self> {
        body.validate()?;
        Ok(Self {
            id: EntryId::new(),
            record: Versioned::new(body, actor),
        })
    }

    /// Current body.
    pub fn body(&self) -> &EntryBody {
        &self.record.body
    }

    /// Command name.
    pub fn command_name(&self) -> &str {
        &self.record.body.command_name
    }

    /// Current version.
    pub fn version(&self) -> u32 {
        self.record.version
    }

    /// Whether the entry is soft-deleted.
    pub fn is_archived(&self) -> bool {
        self.record.archived
    }
}

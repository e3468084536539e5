//! The dictionary table and its lookup policy.

use tracing::{debug, info};
use ucp_core::EntryId;
use ucp_core::text::{contains_ignore_case, find_ignore_case};
use ucp_protocol::ParamToken;

use crate::entry::{DictionaryEntry, EntryBody};
use crate::errors::{DictionaryError, Result};
use crate::remainder::derive_remainder;
use crate::seed::default_entries;

/// A successful keyword match.
#[derive(Clone, Debug, PartialEq)]
pub struct DictionaryMatch<'a> {
    /// Entry that matched.
    pub entry: &'a DictionaryEntry,
    /// Keyword that matched.
    pub keyword: &'a str,
    /// Payload derived from the text after the keyword.
    pub remainder: String,
}

/// Ordered table of entries.
///
/// `revision` increases on every change and lets caches tell whether a
/// compiled packet is still current.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    entries: Vec<DictionaryEntry>,
    revision: u64,
}

impl Dictionary {
    /// Empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dictionary holding the built-in entries.
    pub fn seeded(actor: &str) -> Result<Self> {
        let mut dict = Self::new();
        for body in default_entries()? {
            let _ = dict.insert(body, actor)?;
        }
        Ok(dict)
    }

    /// Load stored entries, validating each body and name uniqueness.
    pub fn from_entries(entries: Vec<DictionaryEntry>) -> Result<Self> {
        let mut dict = Self::new();
        for entry in entries {
            entry.body().validate()?;
            dict.ensure_unique_name(entry.command_name(), None)?;
            dict.entries.push(entry);
        }
        Ok(dict)
    }

    /// Change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// All entries, archived included, in lookup order.
    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    /// Entries that take part in lookup.
    pub fn active_entries(&self) -> impl Iterator<Item = &DictionaryEntry> {
        self.entries.iter().filter(|e| !e.is_archived())
    }

    /// Number of entries, archived included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by ID.
    pub fn get(&self, id: &EntryId) -> Option<&DictionaryEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// Entry by command name.
    pub fn get_by_name(&self, name: &str) -> Option<&DictionaryEntry> {
        self.entries.iter().find(|e| e.command_name() == name)
    }

    /// Append a new entry at the end of the lookup order.
    pub fn insert(&mut self, body: EntryBody, actor: &str) -> Result<&DictionaryEntry> {
        self.ensure_unique_name(&body.command_name, None)?;
        let entry = DictionaryEntry::create(body, actor)?;
        info!(command = entry.command_name(), id = %entry.id, "dictionary entry created");
        self.entries.push(entry);
        self.revision += 1;
        let idx = self.entries.len() - 1;
        Ok(&self.entries[idx])
    }

    /// Replace an entry's body as a new version. Returns changed fields.
    pub fn edit(&mut self, id: &EntryId, body: EntryBody, actor: &str) -> Result<Vec<String>> {
        body.validate()?;
        self.ensure_unique_name(&body.command_name, Some(id))?;
        let entry = self.entry_mut(id)?;
        let changed = entry.record.revise(body, actor);
        if !changed.is_empty() {
            info!(%id, version = entry.version(), ?changed, "dictionary entry revised");
            self.revision += 1;
        }
        Ok(changed)
    }

    /// Soft-delete an entry. Returns `false` if it was already archived.
    pub fn archive(&mut self, id: &EntryId, actor: &str) -> Result<bool> {
        let archived = self.entry_mut(id)?.record.archive(actor);
        if archived {
            info!(%id, "dictionary entry archived");
            self.revision += 1;
        }
        Ok(archived)
    }

    /// Bring an archived entry back. Returns `false` if it was active.
    pub fn restore(&mut self, id: &EntryId, actor: &str) -> Result<bool> {
        let restored = self.entry_mut(id)?.record.restore(actor);
        if restored {
            self.revision += 1;
        }
        Ok(restored)
    }

    /// Restore the body recorded at `version` as a new version.
    pub fn rollback(&mut self, id: &EntryId, version: u32, actor: &str) -> Result<Vec<String>> {
        let snapshot = self
            .get(id)
            .ok_or_else(|| DictionaryError::NotFound(id.clone()))?
            .record
            .audit_log
            .snapshot_at(version)
            .cloned()
            .ok_or_else(|| DictionaryError::UnknownVersion {
                id: id.clone(),
                version,
            })?;
        self.ensure_unique_name(&snapshot.command_name, Some(id))?;
        let entry = self.entry_mut(id)?;
        let changed = entry
            .record
            .rollback(version, actor)
            .ok_or_else(|| DictionaryError::UnknownVersion {
                id: id.clone(),
                version,
            })?;
        info!(%id, to = version, version = entry.version(), "dictionary entry rolled back");
        self.revision += 1;
        Ok(changed)
    }

    /// Find the first active entry with a keyword contained in `text`.
    ///
    /// Entries are tried in order, keywords in their listed order, matching
    /// case-insensitively. The remainder keeps the input's casing.
    pub fn lookup<'a>(&'a self, text: &str) -> Option<DictionaryMatch<'a>> {
        for entry in self.active_entries() {
            for keyword in &entry.body().trigger_keywords {
                if let Some(range) = find_ignore_case(text, keyword) {
                    let remainder = derive_remainder(&text[range.end..]);
                    debug!(command = entry.command_name(), keyword = %keyword, "dictionary match");
                    return Some(DictionaryMatch {
                        entry,
                        keyword,
                        remainder,
                    });
                }
            }
        }
        None
    }

    fn entry_mut(&mut self, id: &EntryId) -> Result<&mut DictionaryEntry> {
        self.entries
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| DictionaryError::NotFound(id.clone()))
    }

    fn ensure_unique_name(&self, name: &str, except: Option<&EntryId>) -> Result<()> {
        let taken = self
            .entries
            .iter()
            .any(|e| e.command_name() == name && Some(&e.id) != except);
        if taken {
            return Err(DictionaryError::DuplicateName(name.to_owned()));
        }
        Ok(())
    }
}

/// Tokens whose phrases occur in `text`, in the entry's mapping order.
pub fn extract_parameters(body: &EntryBody, text: &str) -> Vec<ParamToken> {
    let mut out: Vec<ParamToken> = Vec::new();
    for mapping in &body.parameter_map {
        if contains_ignore_case(text, &mapping.phrase) && !out.contains(&mapping.token) {
            out.push(mapping.token.clone());
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

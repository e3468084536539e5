//! Versioned records with an append-only audit trail.
//!
//! Dictionary entries and rules are edited through [`Versioned`]: every
//! change bumps `version` and appends an [`AuditRecord`] holding a snapshot
//! of the body after the change, so any earlier version can be restored.

use serde::{Deserialize, Serialize};

/// What happened to a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// First version.
    Created,
    /// Body fields changed.
    Updated,
    /// Soft-deleted.
    Archived,
    /// Un-archived.
    Restored,
    /// Body replaced by an earlier snapshot.
    RolledBack,
}

/// One entry of an audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord<T> {
    /// Kind of change.
    pub action: AuditAction,
    /// Version the record produced.
    pub version: u32,
    /// Operator that made the change.
    pub actor: String,
    /// RFC 3339 time of the change.
    pub timestamp: String,
    /// Names of body fields that differ from the previous version.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_fields: Vec<String>,
    /// Body after the change.
    pub snapshot: T,
}

/// Ordered, append-only list of audit records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditTrail<T> {
    records: Vec<AuditRecord<T>>,
}

impl<T> AuditTrail<T> {
    /// All records, oldest first.
    pub fn records(&self) -> &[AuditRecord<T>] {
        &self.records
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&AuditRecord<T>> {
        self.records.last()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the trail has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Body as it was when `version` was produced.
    pub fn snapshot_at(&self, version: u32) -> Option<&T> {
        self.records
            .iter()
            .rev()
            .find(|r| r.version == version)
            .map(|r| &r.snapshot)
    }

    fn push(&mut self, action: AuditAction, version: u32, actor: &str, changed_fields: Vec<String>, snapshot: T) {
        self.records.push(AuditRecord {
            action,
            version,
            actor: actor.to_owned(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            changed_fields,
            snapshot,
        });
    }
}

impl<T> Default for AuditTrail<T> {
    fn default() -> Self {
        Self { records: Vec::new() }
    }
}

/// A body type that can report which of its fields changed.
pub trait Revisable: Clone + PartialEq {
    /// Names of the fields that differ between `self` and `next`.
    fn changed_fields(&self, next: &Self) -> Vec<String>;
}

/// A body plus its version counter, archive flag and audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// Current body.
    pub body: T,
    /// Monotonic version, starting at 1.
    pub version: u32,
    /// Soft-delete flag.
    #[serde(default)]
    pub archived: bool,
    /// Every change, oldest first.
    pub audit_log: AuditTrail<T>,
}

impl<T: Revisable> Versioned<T> {
    /// Create version 1 of `body`.
    pub fn new(body: T, actor: &str) -> Self {
        let mut audit_log = AuditTrail::default();
        audit_log.push(AuditAction::Created, 1, actor, Vec::new(), body.clone());
        Self {
            body,
            version: 1,
            archived: false,
            audit_log,
        }
    }

    /// Replace the body. Returns the changed field names; an empty list
    /// means nothing changed and no version was recorded.
    pub fn revise(&mut self, next: T, actor: &str) -> Vec<String> {
        let changed = self.body.changed_fields(&next);
        if changed.is_empty() {
            return changed;
        }
        self.version += 1;
        self.body = next;
        self.audit_log.push(
            AuditAction::Updated,
            self.version,
            actor,
            changed.clone(),
            self.body.clone(),
        );
        changed
    }

    /// Soft-delete. Returns `false` if already archived.
    pub fn archive(&mut self, actor: &str) -> bool {
        self.set_archived(true, actor)
    }

    /// Undo a soft-delete. Returns `false` if not archived.
    pub fn restore(&mut self, actor: &str) -> bool {
        self.set_archived(false, actor)
    }

    /// Restore the body recorded at `target` as a new version.
    ///
    /// Returns `None` when `target` never existed or is the current version.
    pub fn rollback(&mut self, target: u32, actor: &str) -> Option<Vec<String>> {
        if target == self.version {
            return None;
        }
        let snapshot = self.audit_log.snapshot_at(target)?.clone();
        let changed = self.body.changed_fields(&snapshot);
        self.version += 1;
        self.body = snapshot;
        self.audit_log.push(
            AuditAction::RolledBack,
            self.version,
            actor,
            changed.clone(),
            self.body.clone(),
        );
        Some(changed)
    }

    fn set_archived(&mut self, archived: bool, actor: &str) -> bool {
        if self.archived == archived {
            return false;
        }
        self.archived = archived;
        self.version += 1;
        let action = if archived {
            AuditAction::Archived
        } else {
            AuditAction::Restored
        };
        self.audit_log.push(
            action,
            self.version,
            actor,
            vec!["archived".to_owned()],
            self.body.clone(),
        );
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

//! Dictionary entry repository.
//!
//! Entries are stored whole as JSON next to indexed scalar columns.
//! Lookup order is insertion order, so `position` is kept stable across
//! updates. Entries are never deleted; archive is a flag on the entry.

use rusqlite::{Connection, OptionalExtension, params};
use ucp_core::EntryId;
use ucp_dictionary::DictionaryEntry;
use ucp_protocol::ActionKind;

use crate::errors::{Result, StoreError};

/// Listing order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EntryOrder {
    /// Insertion order, which is also lookup order.
    #[default]
    Position,
    /// Command name, A to Z.
    Name,
    /// Most recently updated first.
    RecentlyUpdated,
}

/// Listing filter.
#[derive(Clone, Debug, Default)]
pub struct EntryFilter {
    /// Only entries for this action.
    pub action: Option<ActionKind>,
    /// Only entries in this category.
    pub category: Option<String>,
    /// Include archived entries.
    pub include_archived: bool,
    /// Ordering.
    pub order: EntryOrder,
}

/// Dictionary entry repository; every method takes `&Connection`.
pub struct DictionaryRepo;

impl DictionaryRepo {
    /// Insert or update an entry. An existing entry keeps its position.
    pub fn save(conn: &Connection, entry: &DictionaryEntry) -> Result<()> {
        let body = entry.body();
        let _ = conn.execute(
            "INSERT INTO dictionary_entries
               (id, command_name, action, category, version, archived, document, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
               command_name = excluded.command_name,
               action       = excluded.action,
               category     = excluded.category,
               version      = excluded.version,
               archived     = excluded.archived,
               document     = excluded.document,
               updated_at   = excluded.updated_at",
            params![
                entry.id.as_str(),
                body.command_name,
                body.action.as_str(),
                body.category,
                entry.version(),
                entry.is_archived(),
                serde_json::to_string(entry)?,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Entry by ID.
    pub fn get(conn: &Connection, id: &EntryId) -> Result<Option<DictionaryEntry>> {
        let doc: Option<String> = conn
            .query_row(
                "SELECT document FROM dictionary_entries WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(doc.map(|d| serde_json::from_str(&d)).transpose()?)
    }

    /// Entries matching `filter`.
    pub fn list(conn: &Connection, filter: &EntryFilter) -> Result<Vec<DictionaryEntry>> {
        use std::fmt::Write;
        let mut sql = String::from("SELECT document FROM dictionary_entries WHERE 1=1");
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(action) = filter.action {
            let _ = write!(sql, " AND action = ?{}", values.len() + 1);
            values.push(Box::new(action.as_str()));
        }
        if let Some(category) = &filter.category {
            let _ = write!(sql, " AND category = ?{}", values.len() + 1);
            values.push(Box::new(category.clone()));
        }
        if !filter.include_archived {
            sql.push_str(" AND archived = 0");
        }
        sql.push_str(match filter.order {
            EntryOrder::Position => " ORDER BY position ASC",
            EntryOrder::Name => " ORDER BY command_name ASC",
            EntryOrder::RecentlyUpdated => " ORDER BY updated_at DESC, position DESC",
        });

        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(Box::as_ref).collect();
        let docs = stmt
            .query_map(refs.as_slice(), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        docs.iter()
            .map(|d| serde_json::from_str(d).map_err(StoreError::from))
            .collect()
    }

    /// Every entry, archived included, in lookup order.
    pub fn all(conn: &Connection) -> Result<Vec<DictionaryEntry>> {
        Self::list(
            conn,
            &EntryFilter {
                include_archived: true,
                ..EntryFilter::default()
            },
        )
    }

    /// Number of stored entries, archived included.
    pub fn count(conn: &Connection) -> Result<u64> {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM dictionary_entries", [], |row| row.get(0))?;
        Ok(crate::sqlite::from_db_int(n))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

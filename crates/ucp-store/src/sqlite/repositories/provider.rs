//! Provider configuration repository.
//!
//! Configurations are validated before they are written. Names are unique
//! and at most one configuration is the default.

use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;
use ucp_core::ProviderConfigId;
use ucp_llm::{ProviderConfig, ProviderKind};

use crate::errors::{Result, StoreError};
use crate::sqlite::{from_db_int, parse_column, to_db_int};

/// Listing order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProviderOrder {
    /// Default first, then by name.
    #[default]
    DefaultFirst,
    /// Name, A to Z.
    Name,
    /// Newest first.
    Newest,
}

/// Listing filter.
#[derive(Clone, Debug, Default)]
pub struct ProviderFilter {
    /// Only configurations of this kind.
    pub kind: Option<ProviderKind>,
    /// Only configurations for this model.
    pub model: Option<String>,
    /// Ordering.
    pub order: ProviderOrder,
}

const COLUMNS: &str = "id, name, kind, base_url, model, api_key, context_window, max_tokens, \
                       temperature, cost_per_1k_input, cost_per_1k_output, timeout_ms, is_default";

struct ProviderRow {
    id: String,
    name: String,
    kind: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    context_window: i64,
    max_tokens: i64,
    temperature: f64,
    cost_per_1k_input: f64,
    cost_per_1k_output: f64,
    timeout_ms: i64,
    is_default: bool,
}

impl ProviderRow {
    fn map(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            base_url: row.get(3)?,
            model: row.get(4)?,
            api_key: row.get(5)?,
            context_window: row.get(6)?,
            max_tokens: row.get(7)?,
            temperature: row.get(8)?,
            cost_per_1k_input: row.get(9)?,
            cost_per_1k_output: row.get(10)?,
            timeout_ms: row.get(11)?,
            is_default: row.get(12)?,
        })
    }

    fn into_config(self) -> Result<ProviderConfig> {
        Ok(ProviderConfig {
            id: ProviderConfigId::from(self.id),
            name: self.name,
            kind: parse_column(&self.kind)?,
            base_url: self.base_url,
            model: self.model,
            api_key: self.api_key,
            context_window: from_db_int(self.context_window),
            max_tokens: from_db_int(self.max_tokens),
            temperature: self.temperature,
            cost_per_1k_input: self.cost_per_1k_input,
            cost_per_1k_output: self.cost_per_1k_output,
            timeout_ms: from_db_int(self.timeout_ms),
            is_default: self.is_default,
        })
    }
}

/// Provider configuration repository; every method takes `&Connection`.
pub struct ProviderRepo;

impl ProviderRepo {
    /// Store a new configuration.
    ///
    /// A new default replaces the previous one.
    pub fn create(conn: &Connection, config: &ProviderConfig) -> Result<()> {
        config.validate()?;
        Self::ensure_name_free(conn, &config.name, None)?;
        let tx = conn.unchecked_transaction()?;
        if config.is_default {
            let _ = tx.execute("UPDATE provider_configs SET is_default = 0 WHERE is_default = 1", [])?;
        }
        let now = chrono::Utc::now().to_rfc3339();
        let _ = tx.execute(
            &format!(
                "INSERT INTO provider_configs ({COLUMNS}, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)"
            ),
            params![
                config.id.as_str(),
                config.name,
                config.kind.as_str(),
                config.base_url,
                config.model,
                config.api_key,
                to_db_int(config.context_window),
                to_db_int(config.max_tokens),
                config.temperature,
                config.cost_per_1k_input,
                config.cost_per_1k_output,
                to_db_int(config.timeout_ms),
                config.is_default,
                now,
            ],
        )?;
        tx.commit()?;
        info!(id = %config.id, name = %config.name, "provider config created");
        Ok(())
    }

    /// Replace a stored configuration.
    pub fn update(conn: &Connection, config: &ProviderConfig) -> Result<()> {
        config.validate()?;
        Self::ensure_name_free(conn, &config.name, Some(&config.id))?;
        let tx = conn.unchecked_transaction()?;
        if config.is_default {
            let _ = tx.execute(
                "UPDATE provider_configs SET is_default = 0 WHERE is_default = 1 AND id != ?1",
                params![config.id.as_str()],
            )?;
        }
        let changed = tx.execute(
            "UPDATE provider_configs SET
               name = ?2, kind = ?3, base_url = ?4, model = ?5, api_key = ?6,
               context_window = ?7, max_tokens = ?8, temperature = ?9,
               cost_per_1k_input = ?10, cost_per_1k_output = ?11, timeout_ms = ?12,
               is_default = ?13, updated_at = ?14
             WHERE id = ?1",
            params![
                config.id.as_str(),
                config.name,
                config.kind.as_str(),
                config.base_url,
                config.model,
                config.api_key,
                to_db_int(config.context_window),
                to_db_int(config.max_tokens),
                config.temperature,
                config.cost_per_1k_input,
                config.cost_per_1k_output,
                to_db_int(config.timeout_ms),
                config.is_default,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("provider config", config.id.as_str()));
        }
        tx.commit()?;
        Ok(())
    }

    /// Configuration by ID.
    pub fn get(conn: &Connection, id: &ProviderConfigId) -> Result<Option<ProviderConfig>> {
        Self::query_one(conn, "id", id.as_str())
    }

    /// Configuration by name.
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<ProviderConfig>> {
        Self::query_one(conn, "name", name)
    }

    /// The default configuration, if one is marked.
    pub fn get_default(conn: &Connection) -> Result<Option<ProviderConfig>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM provider_configs WHERE is_default = 1"),
                [],
                ProviderRow::map,
            )
            .optional()?;
        row.map(ProviderRow::into_config).transpose()
    }

    /// Make `id` the only default.
    pub fn set_default(conn: &Connection, id: &ProviderConfigId) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        let _ = tx.execute("UPDATE provider_configs SET is_default = 0 WHERE is_default = 1", [])?;
        let changed = tx.execute(
            "UPDATE provider_configs SET is_default = 1, updated_at = ?2 WHERE id = ?1",
            params![id.as_str(), chrono::Utc::now().to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("provider config", id.as_str()));
        }
        tx.commit()?;
        info!(%id, "default provider changed");
        Ok(())
    }

    /// Delete a configuration. Returns whether it existed.
    pub fn delete(conn: &Connection, id: &ProviderConfigId) -> Result<bool> {
        let changed = conn.execute("DELETE FROM provider_configs WHERE id = ?1", params![id.as_str()])?;
        Ok(changed > 0)
    }

    /// Configurations matching `filter`.
    pub fn list(conn: &Connection, filter: &ProviderFilter) -> Result<Vec<ProviderConfig>> {
        use std::fmt::Write;
        let mut sql = format!("SELECT {COLUMNS} FROM provider_configs WHERE 1=1");
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(kind) = filter.kind {
            let _ = write!(sql, " AND kind = ?{}", values.len() + 1);
            values.push(Box::new(kind.as_str()));
        }
        if let Some(model) = &filter.model {
            let _ = write!(sql, " AND model = ?{}", values.len() + 1);
            values.push(Box::new(model.clone()));
        }
        sql.push_str(match filter.order {
            ProviderOrder::DefaultFirst => " ORDER BY is_default DESC, name ASC",
            ProviderOrder::Name => " ORDER BY name ASC",
            ProviderOrder::Newest => " ORDER BY created_at DESC, name ASC",
        });

        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(Box::as_ref).collect();
        let rows = stmt
            .query_map(refs.as_slice(), ProviderRow::map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(ProviderRow::into_config).collect()
    }

    fn query_one(conn: &Connection, column: &str, value: &str) -> Result<Option<ProviderConfig>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM provider_configs WHERE {column} = ?1"),
                params![value],
                ProviderRow::map,
            )
            .optional()?;
        row.map(ProviderRow::into_config).transpose()
    }

    fn ensure_name_free(conn: &Connection, name: &str, except: Option<&ProviderConfigId>) -> Result<()> {
        match Self::get_by_name(conn, name)? {
            Some(existing) if Some(&existing.id) != except => Err(StoreError::Conflict(format!(
                "a provider config named '{name}' already exists"
            ))),
            _ => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::run_migrations;
    use assert_matches::assert_matches;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }

    fn config(name: &str) -> ProviderConfig {
        let mut c = ProviderConfig::new(name, "http://localhost:1234", "llama-3");
        c.cost_per_1k_input = 0.001;
        c.api_key = Some("sk-test".into());
        c
    }

    #[test]
    fn create_get_round_trip() {
        let conn = setup();
        let c = config("local");
        ProviderRepo::create(&conn, &c).unwrap();
        assert_eq!(ProviderRepo::get(&conn, &c.id).unwrap(), Some(c.clone()));
        assert_eq!(ProviderRepo::get_by_name(&conn, "local").unwrap(), Some(c));
    }

    #[test]
    fn invalid_config_is_refused() {
        let conn = setup();
        let mut c = config("bad");
        c.temperature = 9.0;
        assert_matches!(ProviderRepo::create(&conn, &c), Err(StoreError::Config(_)));
        assert!(ProviderRepo::list(&conn, &ProviderFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn names_are_unique() {
        let conn = setup();
        ProviderRepo::create(&conn, &config("local")).unwrap();
        assert_matches!(ProviderRepo::create(&conn, &config("local")), Err(StoreError::Conflict(_)));
    }

    #[test]
    fn single_default() {
        let conn = setup();
        let mut a = config("a");
        a.is_default = true;
        let mut b = config("b");
        b.is_default = true;
        ProviderRepo::create(&conn, &a).unwrap();
        ProviderRepo::create(&conn, &b).unwrap();
        assert_eq!(ProviderRepo::get_default(&conn).unwrap().unwrap().id, b.id);

        ProviderRepo::set_default(&conn, &a.id).unwrap();
        let listed = ProviderRepo::list(&conn, &ProviderFilter::default()).unwrap();
        assert_eq!(listed[0].id, a.id);
        assert!(!listed[1].is_default);
    }

    #[test]
    fn update_and_delete() {
        let conn = setup();
        let mut c = config("local");
        ProviderRepo::create(&conn, &c).unwrap();
        c.model = "qwen".into();
        ProviderRepo::update(&conn, &c).unwrap();
        assert_eq!(ProviderRepo::get(&conn, &c.id).unwrap().unwrap().model, "qwen");

        let filtered = ProviderRepo::list(
            &conn,
            &ProviderFilter {
                model: Some("qwen".into()),
                ..ProviderFilter::default()
            },
        )
        .unwrap();
        assert_eq!(filtered.len(), 1);

        assert!(ProviderRepo::delete(&conn, &c.id).unwrap());
        assert!(!ProviderRepo::delete(&conn, &c.id).unwrap());
        assert_matches!(ProviderRepo::update(&conn, &c), Err(StoreError::NotFound { .. }));
    }
}

//! High-level [`Store`] API over the connection pool and repositories.
//!
//! Writes are serialized through one in-process lock and retried when
//! `SQLite` reports the database busy. Multi-row writes run in a single
//! transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, instrument};
use ucp_core::{EntryId, ProviderConfigId, RuleId, SessionId};
use ucp_dictionary::{Dictionary, DictionaryEntry};
use ucp_ledger::Session;
use ucp_llm::ProviderConfig;
use ucp_rules::{Rule, RuleEngine};
use ucp_settings::UcpSettings;

use crate::errors::{Result, StoreError};
use crate::sqlite::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::sqlite::migrations;
use crate::sqlite::repositories::dictionary::{DictionaryRepo, EntryFilter};
use crate::sqlite::repositories::provider::{ProviderFilter, ProviderRepo};
use crate::sqlite::repositories::rule::{RuleFilter, RuleRepo};
use crate::sqlite::repositories::session::{SessionFilter, SessionRepo, SessionStats, SessionSummary};

/// What [`Store::seed_defaults`] wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Built-in dictionary entries written.
    pub entries: usize,
    /// Built-in rules written.
    pub rules: usize,
}

/// Persistent store for the dictionary, rules, provider configurations and
/// sessions.
pub struct Store {
    pool: ConnectionPool,
    write_lock: Mutex<()>,
}

impl Store {
    const BUSY_MAX_RETRIES: u32 = 16;

    /// Wrap an existing pool. The schema must already be migrated.
    pub fn new(pool: ConnectionPool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Open (or create) a database file and bring its schema up to date.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        let pool = connection::new_file(path, config)?;
        Self::migrated(pool)
    }

    /// Fresh in-memory database.
    pub fn in_memory() -> Result<Self> {
        let pool = connection::new_in_memory(&ConnectionConfig::default())?;
        Self::migrated(pool)
    }

    /// Open the database named by `store.path`.
    pub fn open_from_settings(settings: &UcpSettings) -> Result<Self> {
        let path = ucp_settings::resolve_store_path(settings);
        Self::open(&path, &ConnectionConfig::from_settings(&settings.store))
    }

    fn migrated(pool: ConnectionPool) -> Result<Self> {
        let applied = migrations::run_migrations(&*pool.get()?)?;
        if applied > 0 {
            info!(applied, "store schema migrated");
        }
        Ok(Self::new(pool))
    }

    /// Applied schema version.
    pub fn schema_version(&self) -> Result<u32> {
        migrations::current_version(&*self.conn()?)
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    fn lock_write(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Conflict("store write lock poisoned".into()))
    }

    /// Run a write under the store lock, retrying with linear backoff while
    /// the database is busy or locked.
    fn write<T>(&self, mut f: impl FnMut(&rusqlite::Connection) -> Result<T>) -> Result<T> {
        let _guard = self.lock_write()?;
        let conn = self.conn()?;
        let mut attempts = 0;
        loop {
            match f(&conn) {
                Ok(value) => return Ok(value),
                Err(err) if is_busy(&err) && attempts < Self::BUSY_MAX_RETRIES => {
                    attempts += 1;
                    let backoff_ms = u64::from(attempts).saturating_mul(10).min(500);
                    debug!(attempts, backoff_ms, "database busy, retrying");
                    std::thread::sleep(Duration::from_millis(backoff_ms));
                }
                Err(err) => return Err(err),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Dictionary and rules
    // ─────────────────────────────────────────────────────────────────────

    /// Insert or update one dictionary entry.
    pub fn save_entry(&self, entry: &DictionaryEntry) -> Result<()> {
        self.write(|conn| DictionaryRepo::save(conn, entry))
    }

    /// Write every entry of `dictionary` in one transaction.
    #[instrument(skip_all, fields(entries = dictionary.len()))]
    pub fn save_dictionary(&self, dictionary: &Dictionary) -> Result<()> {
        self.write(|conn| {
            let tx = conn.unchecked_transaction()?;
            for entry in dictionary.entries() {
                DictionaryRepo::save(&tx, entry)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Entry by ID.
    pub fn get_entry(&self, id: &EntryId) -> Result<Option<DictionaryEntry>> {
        DictionaryRepo::get(&*self.conn()?, id)
    }

    /// Entries matching `filter`.
    pub fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<DictionaryEntry>> {
        DictionaryRepo::list(&*self.conn()?, filter)
    }

    /// Rebuild the dictionary from stored entries.
    pub fn load_dictionary(&self) -> Result<Dictionary> {
        let entries = DictionaryRepo::all(&*self.conn()?)?;
        Ok(Dictionary::from_entries(entries)?)
    }

    /// Insert or update one rule.
    pub fn save_rule(&self, rule: &Rule) -> Result<()> {
        self.write(|conn| RuleRepo::save(conn, rule))
    }

    /// Write every rule of `engine` in one transaction.
    #[instrument(skip_all, fields(rules = engine.rules().len()))]
    pub fn save_rules(&self, engine: &RuleEngine) -> Result<()> {
        self.write(|conn| {
            let tx = conn.unchecked_transaction()?;
            for rule in engine.rules() {
                RuleRepo::save(&tx, rule)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Rule by ID.
    pub fn get_rule(&self, id: &RuleId) -> Result<Option<Rule>> {
        RuleRepo::get(&*self.conn()?, id)
    }

    /// Rules matching `filter`.
    pub fn list_rules(&self, filter: &RuleFilter) -> Result<Vec<Rule>> {
        RuleRepo::list(&*self.conn()?, filter)
    }

    /// Rebuild the rule engine from stored rules.
    pub fn load_rules(&self) -> Result<RuleEngine> {
        let rules = RuleRepo::all(&*self.conn()?)?;
        Ok(RuleEngine::from_rules(rules)?)
    }

    /// Write the built-in dictionary and rules into whichever of the two
    /// collections is empty.
    #[instrument(skip(self))]
    pub fn seed_defaults(&self, actor: &str) -> Result<SeedReport> {
        self.write(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut report = SeedReport::default();
            if DictionaryRepo::count(&tx)? == 0 {
                let dictionary = Dictionary::seeded(actor)?;
                for entry in dictionary.entries() {
                    DictionaryRepo::save(&tx, entry)?;
                }
                report.entries = dictionary.len();
            }
            if RuleRepo::count(&tx)? == 0 {
                let engine = RuleEngine::with_defaults(actor)?;
                for rule in engine.rules() {
                    RuleRepo::save(&tx, rule)?;
                }
                report.rules = engine.rules().len();
            }
            tx.commit()?;
            if report != SeedReport::default() {
                info!(entries = report.entries, rules = report.rules, "seeded built-in catalog");
            }
            Ok(report)
        })
    }

    /// Stored dictionary and rules, seeding the built-ins first when `seed`
    /// is set.
    pub fn load_catalog(&self, seed: bool) -> Result<(Dictionary, RuleEngine)> {
        if seed {
            let _ = self.seed_defaults("system")?;
        }
        Ok((self.load_dictionary()?, self.load_rules()?))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Provider configurations
    // ─────────────────────────────────────────────────────────────────────

    /// Validate and insert a configuration.
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<()> {
        self.write(|conn| ProviderRepo::create(conn, config))
    }

    /// Validate and replace a configuration.
    pub fn update_provider(&self, config: &ProviderConfig) -> Result<()> {
        self.write(|conn| ProviderRepo::update(conn, config))
    }

    /// Configuration by ID.
    pub fn get_provider(&self, id: &ProviderConfigId) -> Result<Option<ProviderConfig>> {
        ProviderRepo::get(&*self.conn()?, id)
    }

    /// Configuration by name.
    pub fn get_provider_by_name(&self, name: &str) -> Result<Option<ProviderConfig>> {
        ProviderRepo::get_by_name(&*self.conn()?, name)
    }

    /// The default configuration, if one is marked.
    pub fn default_provider(&self) -> Result<Option<ProviderConfig>> {
        ProviderRepo::get_default(&*self.conn()?)
    }

    /// Mark one configuration as the default.
    pub fn set_default_provider(&self, id: &ProviderConfigId) -> Result<()> {
        self.write(|conn| ProviderRepo::set_default(conn, id))
    }

    /// Delete a configuration. Returns whether it existed.
    pub fn delete_provider(&self, id: &ProviderConfigId) -> Result<bool> {
        self.write(|conn| ProviderRepo::delete(conn, id))
    }

    /// Configurations matching `filter`.
    pub fn list_providers(&self, filter: &ProviderFilter) -> Result<Vec<ProviderConfig>> {
        ProviderRepo::list(&*self.conn()?, filter)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────

    /// Persist a session and any hops not yet stored.
    #[instrument(skip_all, fields(session_id = %session.session_id, status = %session.status))]
    pub fn save_session(&self, session: &Session) -> Result<()> {
        self.write(|conn| SessionRepo::save(conn, session))
    }

    /// Session by ID, with hops.
    pub fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        SessionRepo::get(&*self.conn()?, id)
    }

    /// Session by ID, or [`StoreError::NotFound`].
    pub fn require_session(&self, id: &SessionId) -> Result<Session> {
        SessionRepo::require(&*self.conn()?, id)
    }

    /// Session summaries matching `filter`.
    pub fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<SessionSummary>> {
        SessionRepo::list(&*self.conn()?, filter)
    }

    /// Delete a session and its hops. Returns whether it existed.
    pub fn delete_session(&self, id: &SessionId) -> Result<bool> {
        self.write(|conn| SessionRepo::delete(conn, id))
    }

    /// Aggregates over every stored session.
    pub fn session_stats(&self) -> Result<SessionStats> {
        SessionRepo::stats(&*self.conn()?)
    }
}

fn is_busy(err: &StoreError) -> bool {
    match err {
        StoreError::Sqlite(rusqlite::Error::SqliteFailure(code, _)) => matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use ucp_ledger::{HopMetrics, HopType, SessionStatus, append, verify};

    // ── Catalog ──

    #[test]
    fn seed_is_idempotent() {
        let store = Store::in_memory().unwrap();
        let first = store.seed_defaults("system").unwrap();
        assert!(first.entries > 0);
        assert!(first.rules > 0);
        assert_eq!(store.seed_defaults("system").unwrap(), SeedReport::default());
    }

    #[test]
    fn load_catalog_matches_built_ins() {
        let store = Store::in_memory().unwrap();
        let (dictionary, rules) = store.load_catalog(true).unwrap();
        let built_in = Dictionary::seeded("system").unwrap();
        assert_eq!(dictionary.len(), built_in.len());
        assert!(dictionary.lookup("please summarize this report").is_some());
        assert_eq!(rules.rules().len(), RuleEngine::with_defaults("system").unwrap().rules().len());
    }

    #[test]
    fn unseeded_catalog_is_empty() {
        let store = Store::in_memory().unwrap();
        let (dictionary, rules) = store.load_catalog(false).unwrap();
        assert!(dictionary.is_empty());
        assert!(rules.rules().is_empty());
    }

    #[test]
    fn edited_dictionary_survives_reload() {
        let store = Store::in_memory().unwrap();
        let (mut dictionary, _) = store.load_catalog(true).unwrap();
        let id = dictionary.entries()[0].id.clone();
        let _ = dictionary.archive(&id, "alice").unwrap();
        store.save_dictionary(&dictionary).unwrap();

        let reloaded = store.load_dictionary().unwrap();
        assert!(reloaded.get(&id).unwrap().is_archived());
        assert_eq!(reloaded.entries(), dictionary.entries());
    }

    // ── Providers ──

    #[test]
    fn provider_lifecycle() {
        let store = Store::in_memory().unwrap();
        let mut config = ProviderConfig::new("local", "http://localhost:11434/v1", "llama3");
        config.is_default = true;
        store.create_provider(&config).unwrap();
        assert_eq!(store.default_provider().unwrap().unwrap().id, config.id);

        let duplicate = ProviderConfig::new("local", "http://localhost:8080", "other");
        assert_matches!(store.create_provider(&duplicate), Err(StoreError::Conflict(_)));

        assert!(store.delete_provider(&config.id).unwrap());
        assert!(store.default_provider().unwrap().is_none());
    }

    // ── Sessions ──

    #[test]
    fn sessions_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ucp.db");
        let id = {
            let store = Store::open(&path, &ConnectionConfig::default()).unwrap();
            let mut session = Session::new("explain ownership", None);
            session.transition(SessionStatus::Compiling).unwrap();
            let _ = append(&mut session, HopType::Compile, json!({"wire": "w"}), HopMetrics::default()).unwrap();
            store.save_session(&session).unwrap();
            session.session_id
        };

        let store = Store::open(&path, &ConnectionConfig::default()).unwrap();
        assert_eq!(store.schema_version().unwrap(), migrations::latest_version());
        let loaded = store.require_session(&id).unwrap();
        assert_eq!(loaded.hops.len(), 1);
        assert!(verify(&loaded));
        assert_eq!(store.session_stats().unwrap().total, 1);
    }

    #[test]
    fn missing_session_is_not_found() {
        let store = Store::in_memory().unwrap();
        assert_matches!(
            store.require_session(&SessionId::from("nope")),
            Err(StoreError::NotFound { kind: "session", .. })
        );
        assert!(!store.delete_session(&SessionId::from("nope")).unwrap());
    }
}

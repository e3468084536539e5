//! Settings, logging and store shared by every command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use ucp_dictionary::Dictionary;
use ucp_rules::RuleEngine;
use ucp_runtime::Pipeline;
use ucp_settings::UcpSettings;
use ucp_store::Store;

/// Everything a command needs.
pub struct App {
    pub settings: UcpSettings,
    pub store: Arc<Store>,
    pub json: bool,
}

impl App {
    /// Load settings, start logging and open the store.
    pub fn open(db_path: Option<&Path>, log_level: Option<&str>, json: bool) -> Result<Self> {
        let mut settings = ucp_settings::load_settings().context("Failed to load settings")?;
        if let Some(level) = log_level {
            settings.logging.level = level.to_owned();
        }
        ucp_core::logging::init_subscriber(&settings.logging.level);

        if let Some(path) = db_path {
            settings.store.path = path.display().to_string();
        }
        let path = ucp_settings::resolve_store_path(&settings);
        ensure_parent_dir(&path)?;
        debug!(path = %path.display(), "opening store");
        let store = Store::open_from_settings(&settings)
            .with_context(|| format!("Failed to open store: {}", path.display()))?;

        Ok(Self {
            settings,
            store: Arc::new(store),
            json,
        })
    }

    /// App over an existing store with default settings.
    #[cfg(test)]
    pub fn with_store(store: Store, json: bool) -> Self {
        Self {
            settings: UcpSettings::default(),
            store: Arc::new(store),
            json,
        }
    }

    /// Pipeline over the stored catalog.
    pub fn pipeline(&self) -> Result<Pipeline> {
        Pipeline::from_settings(&self.settings, Arc::clone(&self.store)).context("Failed to load catalog")
    }

    /// Stored dictionary and rules, seeded first when configured.
    pub fn catalog(&self) -> Result<(Dictionary, RuleEngine)> {
        self.store
            .load_catalog(self.settings.compiler.seed_defaults)
            .context("Failed to load catalog")
    }

    /// Name recorded in audit trails for edits made here.
    pub fn actor() -> String {
        std::env::var("USER").map_or_else(|_| "cli".to_owned(), |user| format!("cli:{user}"))
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Absolute form of `path` for messages.
pub fn display_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

//! # ucp-settings
//!
//! Configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`UcpSettings::default()`]
//! 2. **User file**: `~/.ucp/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `UCP_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    deep_merge, load_settings, load_settings_from_path, resolve_store_path, settings_path, ucp_home,
};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<UcpSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// The first call loads `~/.ucp/settings.json` plus env overrides and falls
/// back to compiled defaults if loading fails.
pub fn get_settings() -> &'static UcpSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns the value back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: UcpSettings) -> std::result::Result<(), UcpSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

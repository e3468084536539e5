//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::UcpSettings;

/// Directory holding the settings file and the default database (`~/.ucp`).
pub fn ucp_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".ucp")
}

/// Path to the settings file (`~/.ucp/settings.json`).
pub fn settings_path() -> PathBuf {
    ucp_home().join("settings.json")
}

/// Resolve `store.path` against `~/.ucp` when it is relative.
pub fn resolve_store_path(settings: &UcpSettings) -> PathBuf {
    let path = PathBuf::from(&settings.store.path);
    if path.is_absolute() {
        path
    } else {
        ucp_home().join(path)
    }
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<UcpSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or values that fail
/// [`UcpSettings::validate`] are errors.
pub fn load_settings_from_path(path: &Path) -> Result<UcpSettings> {
    let defaults = serde_json::to_value(UcpSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: UcpSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `UCP_*` environment variable overrides.
///
/// Invalid values are logged and ignored.
pub fn apply_env_overrides(settings: &mut UcpSettings) {
    // ── Logging / store ─────────────────────────────────────────────
    if let Some(v) = read_env_string("UCP_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_string("UCP_DB_PATH") {
        settings.store.path = v;
    }
    if let Some(v) = read_env_u64("UCP_DB_MAX_CONNECTIONS", 1, 64) {
        settings.store.max_connections = u32::try_from(v).unwrap_or(64);
    }

    // ── Compiler / executor ─────────────────────────────────────────
    if let Some(v) = read_env_usize("UCP_MAX_PROMPT_LENGTH", 1, 10_000_000) {
        settings.compiler.max_prompt_length = v;
    }
    if let Some(v) = read_env_bool("UCP_SEED_DEFAULTS") {
        settings.compiler.seed_defaults = v;
    }
    if let Some(v) = read_env_u64("UCP_PROVIDER_TIMEOUT_MS", 100, 600_000) {
        settings.executor.timeout_ms = v;
    }

    // ── Provider ────────────────────────────────────────────────────
    if let Some(v) = read_env_string("UCP_PROVIDER_BASE_URL") {
        settings.provider.base_url = v;
    }
    if let Some(v) = read_env_string("UCP_PROVIDER_MODEL") {
        settings.provider.model = v;
    }
    if let Some(v) = read_env_string("UCP_API_KEY") {
        settings.provider.api_key = Some(v);
    }
    if let Some(v) = read_env_u64("UCP_CONTEXT_WINDOW", 256, 10_000_000) {
        settings.provider.context_window = v;
    }
    if let Some(v) = read_env_u64("UCP_MAX_TOKENS", 1, 1_000_000) {
        settings.provider.max_tokens = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within an inclusive range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"provider": {"model": "a", "baseUrl": "u"}});
        let source = serde_json::json!({"provider": {"model": "b"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["provider"]["model"], "b");
        assert_eq!(merged["provider"]["baseUrl"], "u");
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_replace() {
        let merged = deep_merge(serde_json::json!({"a": [1, 2]}), serde_json::json!({"a": [3]}));
        assert_eq!(merged["a"], serde_json::json!([3]));
    }

    // ── loading ─────────────────────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.store.path, "ucp.db");
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"compiler": {"maxPromptLength": 1234}, "store": {"path": "/var/ucp.db"}}"#,
        )
        .unwrap();
        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.compiler.max_prompt_length, 1234);
        assert_eq!(settings.compiler.system_reserve_tokens, 200);
        assert_eq!(resolve_store_path(&settings), PathBuf::from("/var/ucp.db"));
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"provider": {"temperature": 9}}"#).unwrap();
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
    }

    #[test]
    fn relative_store_path_resolves_under_home() {
        let settings = UcpSettings::default();
        let resolved = resolve_store_path(&settings);
        assert!(resolved.ends_with(".ucp/ucp.db"));
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u64_range("500", 100, 1000), Some(500));
        assert_eq!(parse_u64_range("50", 100, 1000), None);
        assert_eq!(parse_u64_range("abc", 0, 10), None);
        assert_eq!(parse_usize_range("10", 1, 10), Some(10));
    }
}

//! Protocol constants and built-in defaults.

/// Crate version (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "ucp";

/// Version of the command protocol stamped on every packet.
pub const UCP_VERSION: &str = "1.0";

/// `prev_hash` of the first hop in every session.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Version of the audit export document layout.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Longest raw prompt the compiler accepts, in characters.
pub const MAX_PROMPT_LENGTH: usize = 50_000;

/// Context window assumed when a provider does not declare one.
pub const DEFAULT_CONTEXT_WINDOW: u64 = 4096;

/// Completion token cap used when a provider does not declare one.
pub const DEFAULT_MAX_TOKENS: u64 = 1024;

/// Tokens held back from the context window for the system prompt.
pub const SYSTEM_RESERVE_TOKENS: u64 = 200;

/// Sampling temperature used when a provider does not declare one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Provider call timeout used when none is configured.
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 30_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_hash_is_64_zeros() {
        assert_eq!(GENESIS_HASH.len(), 64);
        assert!(GENESIS_HASH.chars().all(|c| c == '0'));
    }

    #[test]
    fn version_is_semver() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert_eq!(parts.len(), 3);
        for part in parts {
            let _: u32 = part.parse().expect("each semver segment must be a number");
        }
    }

    #[test]
    fn name_is_lowercase() {
        assert_eq!(NAME, NAME.to_lowercase());
    }
}

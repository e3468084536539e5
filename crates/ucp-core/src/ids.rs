//! Branded ID newtypes.
//!
//! Sessions, packets, dictionary entries, rules and provider configurations
//! each get a distinct ID type so one can never be passed where another is
//! expected. Fresh IDs are UUID v7, so they sort by creation time.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new time-ordered ID.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Wrap an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Borrow the inner string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identifier of one compile-and-execute lifecycle.
    SessionId
}

branded_id! {
    /// Identifier stamped on every compiled packet.
    CommandId
}

branded_id! {
    /// Identifier of a command dictionary entry.
    EntryId
}

branded_id! {
    /// Identifier of a rule.
    RuleId
}

branded_id! {
    /// Identifier of a stored provider configuration.
    ProviderConfigId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_new_is_uuid_v7() {
        let id = SessionId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(CommandId::new(), CommandId::new());
    }

    #[test]
    fn later_ids_sort_after_earlier_ones() {
        let first = SessionId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = SessionId::new();
        assert!(first < second);
    }

    #[test]
    fn from_str_ref_and_display() {
        let id = RuleId::from("rule-1");
        assert_eq!(id.as_str(), "rule-1");
        assert_eq!(format!("{id}"), "rule-1");
    }

    #[test]
    fn deref_and_into_inner() {
        let id = EntryId::from("entry");
        let s: &str = &id;
        assert_eq!(s, "entry");
        assert_eq!(id.into_inner(), "entry");
    }

    #[test]
    fn serde_is_transparent() {
        let id = ProviderConfigId::from("cfg-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"cfg-1\"");
        let back: ProviderConfigId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

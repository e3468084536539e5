//! Shared dictionary and rules.

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;
use ucp_dictionary::Dictionary;
use ucp_rules::RuleEngine;

/// Dictionary and rule engine shared by every compile.
///
/// Reads take both locks at once so a compile sees one consistent
/// generation. Edits go through [`Catalog::edit_dictionary`] and
/// [`Catalog::edit_rules`].
#[derive(Debug, Default)]
pub struct Catalog {
    dictionary: RwLock<Dictionary>,
    rules: RwLock<RuleEngine>,
}

/// Read view of a [`Catalog`].
pub struct CatalogView<'a> {
    /// Dictionary.
    pub dictionary: RwLockReadGuard<'a, Dictionary>,
    /// Rules.
    pub rules: RwLockReadGuard<'a, RuleEngine>,
}

impl CatalogView<'_> {
    /// Generation of this view.
    pub fn generation(&self) -> u64 {
        self.dictionary.revision() + self.rules.revision()
    }
}

impl Catalog {
    /// Wrap a dictionary and rule engine.
    pub fn new(dictionary: Dictionary, rules: RuleEngine) -> Self {
        Self {
            dictionary: RwLock::new(dictionary),
            rules: RwLock::new(rules),
        }
    }

    /// Consistent read view.
    pub fn read(&self) -> CatalogView<'_> {
        CatalogView {
            dictionary: self.dictionary.read(),
            rules: self.rules.read(),
        }
    }

    /// Sum of the dictionary and rule revisions; grows on every edit.
    pub fn generation(&self) -> u64 {
        self.read().generation()
    }

    /// Mutate the dictionary.
    pub fn edit_dictionary<R>(&self, f: impl FnOnce(&mut Dictionary) -> R) -> R {
        let mut dictionary = self.dictionary.write();
        let out = f(&mut dictionary);
        debug!(revision = dictionary.revision(), "dictionary edited");
        out
    }

    /// Mutate the rules.
    pub fn edit_rules<R>(&self, f: impl FnOnce(&mut RuleEngine) -> R) -> R {
        let mut rules = self.rules.write();
        let out = f(&mut rules);
        debug!(revision = rules.revision(), "rules edited");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucp_dictionary::EntryBody;
    use ucp_protocol::ActionKind;

    #[test]
    fn edits_advance_the_generation() {
        let catalog = Catalog::new(Dictionary::seeded("system").unwrap(), RuleEngine::with_defaults("system").unwrap());
        let before = catalog.generation();

        let body = EntryBody::new("Outline", ActionKind::List, "Productivity", &["outline"], &[]).unwrap();
        let inserted = catalog.edit_dictionary(|d| d.insert(body, "t").map(|e| e.id.clone()));
        assert!(inserted.is_ok());
        assert_eq!(catalog.generation(), before + 1);

        let failed = catalog.edit_rules(|r| r.archive(&ucp_core::RuleId::new(), "t"));
        assert!(failed.is_err());
        assert_eq!(catalog.generation(), before + 1);
    }
}

//! Positional account aliases.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::value::Address;

const ALIASES_BY_INDEX: &[&[&str]] = &[
    &["Default", "Root", "Admin", "First"],
    &["Bank", "Second"],
    &["Geoff", "Third"],
    &["Torrey", "Fourth"],
    &["Robert", "Fifth"],
    &["Coburn", "Sixth"],
    &["Jared", "Seventh"],
];

static ALIAS_INDEX: Lazy<BTreeMap<String, usize>> = Lazy::new(|| {
    ALIASES_BY_INDEX
        .iter()
        .enumerate()
        .flat_map(|(index, names)| names.iter().map(move |name| (name.to_ascii_lowercase(), index)))
        .collect()
});

/// Aliases for the account at `index`, e.g. `["Geoff", "Third"]` for index 2.
pub fn account_aliases(index: usize) -> &'static [&'static str] {
    ALIASES_BY_INDEX.get(index).copied().unwrap_or(&[])
}

/// Account index for a positional alias, case-insensitively.
pub fn alias_index(alias: &str) -> Option<usize> {
    ALIAS_INDEX.get(&alias.to_ascii_lowercase()).copied()
}

pub fn resolve_account(accounts: &[Address], alias: &str) -> Option<Address> {
    alias_index(alias).and_then(|index| accounts.get(index).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_positional_and_case_insensitive() {
        let accounts: Vec<Address> = (0u8..8).map(|i| Address([i; 20])).collect();
        assert_eq!(resolve_account(&accounts, "root"), Some(accounts[0]));
        assert_eq!(resolve_account(&accounts, "ADMIN"), Some(accounts[0]));
        assert_eq!(resolve_account(&accounts, "Geoff"), Some(accounts[2]));
        assert_eq!(resolve_account(&accounts, "Jared"), Some(accounts[6]));
        assert_eq!(resolve_account(&accounts, "Nobody"), None);
        assert_eq!(resolve_account(&accounts[..1], "Bank"), None);
    }

    #[test]
    fn aliases_for_index() {
        assert_eq!(account_aliases(3), &["Torrey", "Fourth"]);
        assert!(account_aliases(9).is_empty());
    }
}

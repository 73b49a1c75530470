//! `PairingTable` - symmetric map of matched connection ids.
//!
//! Both directions of a pairing are written and removed in single operations,
//! so every observable state satisfies the symmetry invariant: a→b implies
//! b→a. Half-paired states are unrepresentable through this interface.

use crate::errors::MatchError;

use std::collections::HashMap;

/// Bidirectional mapping from a connection id to its chat partner.
#[derive(Debug, Default)]
pub struct PairingTable {
    partners: HashMap<String, String>,
}

impl PairingTable {
    /// Create an empty pairing table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair two connections, writing both directions atomically.
    ///
    /// Fails with [`MatchError::AlreadyPaired`] if either side already has a
    /// partner, and rejects pairing a connection with itself. Neither failure
    /// mutates the table.
    pub fn pair(&mut self, a: &str, b: &str) -> Result<(), MatchError> {
        if a == b {
            return Err(MatchError::Internal(format!(
                "cannot pair connection {a} with itself"
            )));
        }
        if self.partners.contains_key(a) {
            return Err(MatchError::AlreadyPaired(a.to_string()));
        }
        if self.partners.contains_key(b) {
            return Err(MatchError::AlreadyPaired(b.to_string()));
        }
        self.partners.insert(a.to_string(), b.to_string());
        self.partners.insert(b.to_string(), a.to_string());
        Ok(())
    }

    /// Look up the partner of a connection.
    #[must_use]
    pub fn partner_of(&self, id: &str) -> Option<&String> {
        self.partners.get(id)
    }

    /// Remove a pairing, clearing both directions in one step.
    ///
    /// Returns the removed partner id, or `None` if the connection was
    /// unpaired (no-op).
    pub fn unpair(&mut self, id: &str) -> Option<String> {
        let partner = self.partners.remove(id)?;
        self.partners.remove(&partner);
        Some(partner)
    }

    /// Whether the connection currently has a partner.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.partners.contains_key(id)
    }

    /// Number of active pairings (pairs, not directed entries).
    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.partners.len() / 2
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    /// Snapshot of all directed entries, for invariant checks.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String)> {
        self.partners
            .iter()
            .map(|(a, b)| (a.clone(), b.clone()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_symmetric() {
        let mut pairs = PairingTable::new();
        pairs.pair("a", "b").unwrap();

        assert_eq!(pairs.partner_of("a"), Some(&"b".to_string()));
        assert_eq!(pairs.partner_of("b"), Some(&"a".to_string()));
        assert_eq!(pairs.pair_count(), 1);
    }

    #[test]
    fn test_pair_already_paired_fails_without_mutation() {
        let mut pairs = PairingTable::new();
        pairs.pair("a", "b").unwrap();

        let result = pairs.pair("a", "c");
        assert!(matches!(result, Err(MatchError::AlreadyPaired(_))));
        // Existing pairing untouched, "c" not half-paired
        assert_eq!(pairs.partner_of("a"), Some(&"b".to_string()));
        assert_eq!(pairs.partner_of("c"), None);

        let result = pairs.pair("c", "b");
        assert!(matches!(result, Err(MatchError::AlreadyPaired(_))));
        assert_eq!(pairs.partner_of("b"), Some(&"a".to_string()));
        assert_eq!(pairs.partner_of("c"), None);
    }

    #[test]
    fn test_pair_with_self_rejected() {
        let mut pairs = PairingTable::new();
        let result = pairs.pair("a", "a");
        assert!(result.is_err());
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_unpair_clears_both_directions() {
        let mut pairs = PairingTable::new();
        pairs.pair("a", "b").unwrap();

        let removed = pairs.unpair("a");
        assert_eq!(removed, Some("b".to_string()));
        assert_eq!(pairs.partner_of("a"), None);
        assert_eq!(pairs.partner_of("b"), None);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_unpair_unpaired_is_noop() {
        let mut pairs = PairingTable::new();
        assert_eq!(pairs.unpair("ghost"), None);
    }

    #[test]
    fn test_entries_are_pairwise_symmetric() {
        let mut pairs = PairingTable::new();
        pairs.pair("a", "b").unwrap();
        pairs.pair("c", "d").unwrap();

        let entries = pairs.entries();
        assert_eq!(entries.len(), 4);
        for (x, y) in &entries {
            assert!(entries.contains(&(y.clone(), x.clone())));
        }
    }
}

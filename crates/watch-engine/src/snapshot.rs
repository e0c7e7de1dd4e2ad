//! Normalization of the host's tab enumeration.
//!
//! The host reports tabs as a nested tree (tabs with subtabs), each node
//! optionally bound to a record and carrying its own focus flag. The
//! resolver flattens the tree into an ordered [`TabSnapshot`] where at most
//! one entry is focused:
//!
//! - nodes without a bound record are dropped
//! - a focused subtab takes the focus away from its parent tab
//! - a focused subtab without a record leaves its parent tab unfocused
//! - if the host reports focus on more than one top-level tab, the first
//!   claim wins

use tracing::debug;

use watch_core::types::{ObjectType, RecordId, RecordKey, TabDescriptor};

/// One open record in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// The record bound to the tab.
    pub key: RecordKey,
    /// Whether this is the focused record.
    pub focused: bool,
}

/// Point-in-time view of the records the local user has open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl TabSnapshot {
    /// A snapshot with no open records.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Entries in host order.
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    /// The focused record, if any.
    pub fn focused(&self) -> Option<&RecordKey> {
        self.entries.iter().find(|e| e.focused).map(|e| &e.key)
    }

    /// Whether `key` is open in any tab.
    pub fn contains(&self, key: &RecordKey) -> bool {
        self.entries.iter().any(|e| &e.key == key)
    }

    /// Whether no record is open.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Focus claim made by one subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    None,
    /// Focus sits on a node without a record.
    Unbound,
    /// Focus sits on the entry at this index.
    At(usize),
}

/// Turns raw tab descriptors into a [`TabSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotResolver {
    fallback_type: Option<ObjectType>,
}

impl SnapshotResolver {
    /// Create a resolver. `fallback_type` is used for descriptors that
    /// do not report an object type.
    pub fn new(fallback_type: Option<ObjectType>) -> Self {
        Self { fallback_type }
    }

    /// Flatten `tabs` into a snapshot.
    pub fn resolve(&self, tabs: &[TabDescriptor]) -> TabSnapshot {
        let mut entries = Vec::new();
        let mut claim = Focus::None;

        for tab in tabs {
            let focus = self.walk(tab, &mut entries);
            match (claim, focus) {
                (_, Focus::None) => {}
                (Focus::None, found) => claim = found,
                (_, ignored) => {
                    debug!(?ignored, tab = ?tab.tab_id, "Ignoring second focused tab");
                }
            }
        }

        if let Focus::At(idx) = claim {
            entries[idx].focused = true;
        }

        TabSnapshot { entries }
    }

    fn walk(&self, tab: &TabDescriptor, entries: &mut Vec<SnapshotEntry>) -> Focus {
        let own = self.key_for(tab).map(|key| {
            entries.push(SnapshotEntry {
                key,
                focused: false,
            });
            entries.len() - 1
        });

        let mut nested = Focus::None;
        for subtab in &tab.subtabs {
            let focus = self.walk(subtab, entries);
            if nested == Focus::None {
                nested = focus;
            }
        }

        match nested {
            Focus::None if tab.focused => own.map_or(Focus::Unbound, Focus::At),
            other => other,
        }
    }

    fn key_for(&self, tab: &TabDescriptor) -> Option<RecordKey> {
        let record_id = tab
            .record_id
            .as_deref()
            .and_then(|id| RecordId::new(id).ok())?;

        let object_type = tab
            .object_type
            .as_deref()
            .and_then(|ty| ObjectType::new(ty).ok())
            .or_else(|| self.fallback_type.clone());

        match object_type {
            Some(object_type) => Some(RecordKey::new(object_type, record_id)),
            None => {
                debug!(record = %record_id, "Dropping tab without an object type");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ty: &str, id: &str) -> RecordKey {
        RecordKey::new(ObjectType::new(ty).unwrap(), RecordId::new(id).unwrap())
    }

    fn resolver() -> SnapshotResolver {
        SnapshotResolver::new(None)
    }

    #[test]
    fn test_empty_payload() {
        let snapshot = resolver().resolve(&[]);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.focused(), None);
    }

    #[test]
    fn test_focused_subtab_wins_over_parent() {
        let tabs = vec![
            TabDescriptor::record("Account", "A", false)
                .with_subtabs(vec![TabDescriptor::record("Account", "B", true)]),
        ];
        let snapshot = resolver().resolve(&tabs);
        assert_eq!(snapshot.entries().len(), 2);
        assert_eq!(snapshot.focused(), Some(&key("Account", "B")));
    }

    #[test]
    fn test_focused_parent_with_focused_subtab() {
        let tabs = vec![
            TabDescriptor::record("Account", "A", true)
                .with_subtabs(vec![TabDescriptor::record("Contact", "C", true)]),
        ];
        let snapshot = resolver().resolve(&tabs);
        assert_eq!(snapshot.focused(), Some(&key("Contact", "C")));
        assert_eq!(snapshot.entries().iter().filter(|e| e.focused).count(), 1);
    }

    #[test]
    fn test_unbound_focused_subtab_clears_parent_focus() {
        let unbound = TabDescriptor {
            focused: true,
            ..Default::default()
        };
        let tabs = vec![TabDescriptor::record("Account", "A", true).with_subtabs(vec![unbound])];
        let snapshot = resolver().resolve(&tabs);
        assert!(snapshot.contains(&key("Account", "A")));
        assert_eq!(snapshot.focused(), None);
    }

    #[test]
    fn test_drops_unbound_tabs() {
        let tabs = vec![
            TabDescriptor::default().with_tab_id("home"),
            TabDescriptor::record("Case", "  ", true),
            TabDescriptor::record("Case", "5003", false),
        ];
        let snapshot = resolver().resolve(&tabs);
        assert_eq!(snapshot.entries().len(), 1);
        assert!(snapshot.contains(&key("Case", "5003")));
        assert_eq!(snapshot.focused(), None);
    }

    #[test]
    fn test_first_focus_claim_wins() {
        let tabs = vec![
            TabDescriptor::record("Case", "1", true),
            TabDescriptor::record("Case", "2", true),
        ];
        let snapshot = resolver().resolve(&tabs);
        assert_eq!(snapshot.focused(), Some(&key("Case", "1")));
    }

    #[test]
    fn test_fallback_object_type() {
        let tab = TabDescriptor {
            record_id: Some("001".into()),
            focused: true,
            ..Default::default()
        };
        let without = resolver().resolve(std::slice::from_ref(&tab));
        assert!(without.is_empty());

        let with = SnapshotResolver::new(Some(ObjectType::new("Account").unwrap())).resolve(&[tab]);
        assert_eq!(with.focused(), Some(&key("Account", "001")));
    }
}

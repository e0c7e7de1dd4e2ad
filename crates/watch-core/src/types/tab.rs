//! Raw tab descriptors as reported by the host workspace.

use serde::{Deserialize, Serialize};

/// One workspace tab or subtab.
///
/// Tabs may nest subtabs one level deep; subtabs never carry further
/// subtabs in practice, but the shape allows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDescriptor {
    /// Host-assigned tab identifier.
    #[serde(default)]
    pub tab_id: Option<String>,
    /// Record bound to the tab, if any.
    #[serde(default)]
    pub record_id: Option<String>,
    /// Object type of the bound record, when the host reports it.
    #[serde(default)]
    pub object_type: Option<String>,
    /// Whether the tab has focus.
    #[serde(default)]
    pub focused: bool,
    /// Nested subtabs.
    #[serde(default)]
    pub subtabs: Vec<TabDescriptor>,
}

impl TabDescriptor {
    /// A tab bound to `record_id` of `object_type`.
    pub fn record(object_type: &str, record_id: &str, focused: bool) -> Self {
        Self {
            tab_id: None,
            record_id: Some(record_id.to_string()),
            object_type: Some(object_type.to_string()),
            focused,
            subtabs: Vec::new(),
        }
    }

    /// Attach subtabs.
    pub fn with_subtabs(mut self, subtabs: Vec<TabDescriptor>) -> Self {
        self.subtabs = subtabs;
        self
    }

    /// Set the host tab id.
    pub fn with_tab_id(mut self, tab_id: impl Into<String>) -> Self {
        self.tab_id = Some(tab_id.into());
        self
    }
}

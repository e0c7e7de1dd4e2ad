//! Display-ready watcher list.

use serde::{Deserialize, Serialize, Serializer};

use watch_core::types::{UserId, UserProfile};

/// Freshness of a watcher's mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatcherStatus {
    Active,
    Inactive,
}

impl std::fmt::Display for WatcherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Inactive => write!(f, "Inactive"),
        }
    }
}

/// One other user watching the focused record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherView {
    pub user_id: UserId,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub is_active: bool,
    /// `"<name> - Active"` or `"<name> - Inactive"`.
    pub label: String,
}

impl WatcherView {
    /// Build a view from a resolved profile.
    pub fn new(profile: &UserProfile, status: WatcherStatus) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            display_name: profile.display_name.clone(),
            photo_url: profile.photo_url.clone(),
            is_active: status == WatcherStatus::Active,
            label: format!("{} - {status}", profile.display_name),
        }
    }
}

/// Ordered watchers of the focused record, excluding the local user.
///
/// Active watchers come first, then by display name. Serializes as the UI
/// payload: `isWatched`, `count`, `inlineLimit`, and the `inline` and
/// `overflow` halves of the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherList {
    pub watchers: Vec<WatcherView>,
    /// How many watchers are shown before the overflow list.
    pub inline_limit: usize,
}

impl WatcherList {
    /// Whether anyone other than the local user watches the record.
    pub fn is_watched(&self) -> bool {
        !self.watchers.is_empty()
    }

    pub fn count(&self) -> usize {
        self.watchers.len()
    }

    /// Watchers shown inline.
    pub fn inline(&self) -> &[WatcherView] {
        let end = self.inline_limit.min(self.watchers.len());
        &self.watchers[..end]
    }

    /// Watchers behind "show more".
    pub fn overflow(&self) -> &[WatcherView] {
        let start = self.inline_limit.min(self.watchers.len());
        &self.watchers[start..]
    }

    /// Watcher ids in display order.
    pub fn user_ids(&self) -> Vec<&UserId> {
        self.watchers.iter().map(|w| &w.user_id).collect()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WatcherListPayload<'a> {
    is_watched: bool,
    count: usize,
    inline_limit: usize,
    inline: &'a [WatcherView],
    overflow: &'a [WatcherView],
}

impl Serialize for WatcherList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WatcherListPayload {
            is_watched: self.is_watched(),
            count: self.count(),
            inline_limit: self.inline_limit,
            inline: self.inline(),
            overflow: self.overflow(),
        }
        .serialize(serializer)
    }
}

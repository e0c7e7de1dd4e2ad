//! User display profiles returned by the identity lookup.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Display data for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User id.
    pub user_id: UserId,
    /// Name shown in the watcher list.
    pub display_name: String,
    /// Small photo URL, when the user has one.
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl UserProfile {
    /// Stand-in for a user the lookup could not resolve.
    pub fn placeholder(user_id: UserId) -> Self {
        Self {
            display_name: user_id.to_string(),
            user_id,
            photo_url: None,
        }
    }
}

//! Static profile directory.

use async_trait::async_trait;
use dashmap::DashMap;

use watch_core::result::AppResult;
use watch_core::traits::profile::ProfileLookup;
use watch_core::types::{UserId, UserProfile};

/// [`ProfileLookup`] over a fixed set of profiles. Unknown ids are simply
/// missing from the result.
#[derive(Debug, Default)]
pub struct ProfileDirectory {
    profiles: DashMap<UserId, UserProfile>,
}

impl ProfileDirectory {
    pub fn new(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let directory = Self::default();
        for profile in profiles {
            directory.insert(profile);
        }
        directory
    }

    /// Add or replace a profile.
    pub fn insert(&self, profile: UserProfile) {
        self.profiles.insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl ProfileLookup for ProfileDirectory {
    async fn resolve(&self, ids: &[UserId]) -> AppResult<Vec<UserProfile>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.profiles.get(id).map(|p| p.value().clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_is_partial() {
        let directory = ProfileDirectory::new(vec![UserProfile {
            user_id: UserId::new("U2").unwrap(),
            display_name: "Two".into(),
            photo_url: None,
        }]);
        let ids = vec![UserId::new("U2").unwrap(), UserId::new("U3").unwrap()];
        let found = directory.resolve(&ids).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].display_name, "Two");
    }
}

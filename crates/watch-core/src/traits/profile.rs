//! User identity lookup contract.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{UserId, UserProfile};

/// Batch resolution of user ids to display profiles.
///
/// Implementations may return fewer profiles than requested; callers
/// treat missing ids as unresolved rather than as an error.
#[async_trait]
pub trait ProfileLookup: Send + Sync + std::fmt::Debug + 'static {
    /// Resolve the given ids. Order of the result is unspecified.
    async fn resolve(&self, ids: &[UserId]) -> AppResult<Vec<UserProfile>>;
}

//! Host tab enumeration contract.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::TabDescriptor;

/// Pull API over the host workspace's open tabs.
#[async_trait]
pub trait TabSource: Send + Sync + std::fmt::Debug + 'static {
    /// All open tabs in display order, with their subtabs.
    async fn open_tabs(&self) -> AppResult<Vec<TabDescriptor>>;
}

//! Tab source fed by the caller.

use async_trait::async_trait;
use tokio::sync::RwLock;

use watch_core::result::AppResult;
use watch_core::traits::tabs::TabSource;
use watch_core::types::TabDescriptor;

/// [`TabSource`] returning whatever tabs were last set.
#[derive(Debug, Default)]
pub struct StaticTabSource {
    tabs: RwLock<Vec<TabDescriptor>>,
}

impl StaticTabSource {
    pub fn new(tabs: Vec<TabDescriptor>) -> Self {
        Self {
            tabs: RwLock::new(tabs),
        }
    }

    /// Replace the open tabs.
    pub async fn set_tabs(&self, tabs: Vec<TabDescriptor>) {
        *self.tabs.write().await = tabs;
    }

    /// Drop every tab whose record, or any subtab's record, is `record_id`.
    pub async fn close_record(&self, record_id: &str) {
        let mut tabs = self.tabs.write().await;
        tabs.retain(|tab| tab.record_id.as_deref() != Some(record_id));
        for tab in tabs.iter_mut() {
            tab.subtabs
                .retain(|sub| sub.record_id.as_deref() != Some(record_id));
        }
    }
}

#[async_trait]
impl TabSource for StaticTabSource {
    async fn open_tabs(&self) -> AppResult<Vec<TabDescriptor>> {
        Ok(self.tabs.read().await.clone())
    }
}

//! Reconciler and projector configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Presence reconciliation and watcher projection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Object type assumed for tab descriptors that do not carry one.
    #[serde(default)]
    pub default_object_type: Option<String>,
    /// Age of the client's own mark after which it is re-stamped.
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,
    /// A watcher whose mark is younger than this is shown as active.
    #[serde(default = "default_active_threshold")]
    pub active_threshold_seconds: u64,
    /// Deadline for every store, tab, channel, and profile call.
    #[serde(default = "default_io_timeout")]
    pub io_timeout_ms: u64,
    /// Remove the bucket when its last watcher leaves instead of keeping
    /// an empty mapping.
    #[serde(default)]
    pub evict_empty_buckets: bool,
    /// Number of watchers displayed inline before the overflow list.
    #[serde(default = "default_inline_limit")]
    pub inline_limit: usize,
}

impl PresenceConfig {
    /// Refresh window as a [`Duration`].
    pub fn refresh_window(&self) -> Duration {
        Duration::from_secs(self.refresh_seconds)
    }

    /// Active threshold as a chrono duration, for comparing mark timestamps.
    /// Saturates instead of overflowing.
    pub fn active_threshold(&self) -> chrono::Duration {
        i64::try_from(self.active_threshold_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// I/O deadline as a [`Duration`].
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            default_object_type: None,
            refresh_seconds: default_refresh_seconds(),
            active_threshold_seconds: default_active_threshold(),
            io_timeout_ms: default_io_timeout(),
            evict_empty_buckets: false,
            inline_limit: default_inline_limit(),
        }
    }
}

fn default_refresh_seconds() -> u64 {
    30
}

fn default_active_threshold() -> u64 {
    120
}

fn default_io_timeout() -> u64 {
    5000
}

fn default_inline_limit() -> usize {
    5
}

//! Change notifier configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Push channel subscription and fallback tick settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Name of the push channel carrying record change events.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Since-marker used for the first subscription. `-1` replays nothing.
    #[serde(default = "default_replay_from")]
    pub replay_from: i64,
    /// Interval of the fallback tick, in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Buffer size of the session event queue and in-process channels.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl NotifierConfig {
    /// Fallback tick interval as a [`Duration`], never shorter than 1ms.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            replay_from: default_replay_from(),
            tick_interval_ms: default_tick_interval(),
            event_buffer: default_event_buffer(),
        }
    }
}

fn default_channel() -> String {
    "/event/Record_Watcher__e".to_string()
}

fn default_replay_from() -> i64 {
    -1
}

fn default_tick_interval() -> u64 {
    5000
}

fn default_event_buffer() -> usize {
    256
}

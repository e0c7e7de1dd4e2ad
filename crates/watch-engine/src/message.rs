//! Messages flowing into and out of a watch session.

use serde::Serialize;

use watch_core::error::ErrorKind;
use watch_core::types::{ChangeEvent, ObjectType, RecordKey};

use crate::projector::WatcherList;

/// Signals processed by the session loop, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The host reported a tab open, close or focus change.
    Snapshot,
    /// The host reloaded the current tab.
    TabRefreshed,
    /// Fallback timer fired.
    Tick,
    /// A change event arrived on the push channel.
    Push(ChangeEvent),
    /// A tab bound to this record was closed or the page is unloading.
    TabClosed(RecordKey),
    /// The push channel for an object type stopped delivering.
    ChannelClosed(ObjectType),
    /// End the session.
    Shutdown,
}

/// Updates sent to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundUpdate {
    /// The watcher list of the focused record changed.
    Watchers(WatcherList),
    /// A change to a record other than the focused one.
    Ambient(ChangeEvent),
    /// Some part of the engine is running degraded.
    Degraded { kind: ErrorKind, detail: String },
}

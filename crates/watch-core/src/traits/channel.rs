//! Push channel contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::result::AppResult;
use crate::types::{ChangeEvent, RecordKey};

/// Since-marker meaning "only events published after subscribing".
pub const REPLAY_NEW: i64 = -1;

/// Since-marker meaning "every event the channel still retains".
pub const REPLAY_ALL: i64 = -2;

/// An active registration on a named push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Opaque handle assigned at subscribe time.
    pub id: Uuid,
    /// Channel name.
    pub channel: String,
    /// Since-marker the subscription was opened with.
    pub since: i64,
}

impl Subscription {
    /// A fresh subscription handle for `channel`.
    pub fn new(channel: impl Into<String>, since: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            since,
        }
    }
}

/// Result of a successful subscribe call.
#[derive(Debug)]
pub struct Subscribed {
    /// Handle used to unsubscribe.
    pub subscription: Subscription,
    /// Retained events after the since-marker, oldest first. May overlap
    /// with the first events on `receiver`; consumers skip markers they
    /// have already seen.
    pub backlog: Vec<ChangeEvent>,
    /// Live events.
    pub receiver: broadcast::Receiver<ChangeEvent>,
}

/// Publish/subscribe transport carrying [`ChangeEvent`]s.
#[async_trait]
pub trait PushChannel: Send + Sync + std::fmt::Debug + 'static {
    /// Subscribe to `channel`, receiving events after the `since` marker.
    async fn subscribe(&self, channel: &str, since: i64) -> AppResult<Subscribed>;

    /// Drop a subscription. Unknown handles are ignored.
    async fn unsubscribe(&self, subscription: &Subscription) -> AppResult<()>;

    /// Announce that the entry of `record` changed. Returns the change
    /// marker the channel assigned to the event.
    async fn publish(&self, channel: &str, record: &RecordKey) -> AppResult<i64>;
}

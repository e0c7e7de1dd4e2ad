//! In-memory push channel for single-node deployments.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use watch_core::error::AppError;
use watch_core::result::AppResult;
use watch_core::traits::channel::{PushChannel, REPLAY_ALL, REPLAY_NEW, Subscribed, Subscription};
use watch_core::types::{ChangeEvent, RecordKey};

#[derive(Debug)]
struct ChannelState {
    tx: broadcast::Sender<ChangeEvent>,
    /// Recent events for since-marker replay, oldest first.
    history: VecDeque<ChangeEvent>,
    next_marker: i64,
    subscribers: HashSet<Uuid>,
}

/// In-memory [`PushChannel`] backed by one broadcast sender per channel.
///
/// Markers are assigned per channel starting at 1. The last `retained`
/// events of each channel are kept for replay.
#[derive(Debug)]
pub struct MemoryPushChannel {
    channels: DashMap<String, ChannelState>,
    buffer_size: usize,
    retained: usize,
}

impl MemoryPushChannel {
    pub fn new(buffer_size: usize, retained: usize) -> Self {
        Self {
            channels: DashMap::new(),
            buffer_size: buffer_size.max(1),
            retained,
        }
    }

    /// Number of live subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|state| state.subscribers.len())
            .unwrap_or(0)
    }

    fn new_state(&self) -> ChannelState {
        ChannelState {
            tx: broadcast::channel(self.buffer_size).0,
            history: VecDeque::new(),
            next_marker: 1,
            subscribers: HashSet::new(),
        }
    }
}

#[async_trait]
impl PushChannel for MemoryPushChannel {
    async fn subscribe(&self, channel: &str, since: i64) -> AppResult<Subscribed> {
        if channel.trim().is_empty() {
            return Err(AppError::validation("channel name must not be empty"));
        }

        let mut state = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| self.new_state());

        let receiver = state.tx.subscribe();
        let backlog = match since {
            REPLAY_NEW => Vec::new(),
            REPLAY_ALL => state.history.iter().cloned().collect(),
            marker if marker >= 0 => state
                .history
                .iter()
                .filter(|event| event.change_marker > marker)
                .cloned()
                .collect(),
            other => {
                return Err(AppError::validation(format!(
                    "unsupported replay marker {other}"
                )));
            }
        };

        let subscription = Subscription::new(channel, since);
        state.subscribers.insert(subscription.id);
        debug!(channel, since, backlog = backlog.len(), "Subscribed");

        Ok(Subscribed {
            subscription,
            backlog,
            receiver,
        })
    }

    async fn unsubscribe(&self, subscription: &Subscription) -> AppResult<()> {
        if let Some(mut state) = self.channels.get_mut(&subscription.channel) {
            state.subscribers.remove(&subscription.id);
        }
        Ok(())
    }

    async fn publish(&self, channel: &str, record: &RecordKey) -> AppResult<i64> {
        let mut state = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| self.new_state());

        let marker = state.next_marker;
        state.next_marker += 1;

        let event = ChangeEvent::new(
            record.object_type().clone(),
            record.record_id().clone(),
            marker,
        );

        if self.retained > 0 {
            if state.history.len() == self.retained {
                state.history.pop_front();
            }
            state.history.push_back(event.clone());
        }

        // No receivers is not an error: nobody is listening yet.
        let _ = state.tx.send(event);
        Ok(marker)
    }
}

//! Push-channel subscription lifecycle.
//!
//! One subscription is kept per object type of interest. Each subscription
//! gets a forwarder task that filters channel events by object type, drops
//! markers it has already seen and queues the rest on the session.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use watch_core::config::notifier::NotifierConfig;
use watch_core::error::{AppError, ErrorKind};
use watch_core::result::AppResult;
use watch_core::traits::channel::{PushChannel, Subscription};
use watch_core::types::{ChangeEvent, ObjectType, RecordKey};

use super::tick::FallbackTick;
use crate::io::with_deadline;
use crate::message::SessionEvent;

/// Subscription state of one object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Active,
    /// Subscribing failed or delivery stopped; retried on every tick.
    Degraded,
    Inactive,
}

#[derive(Debug)]
struct ActiveSubscription {
    subscription: Subscription,
    forwarder: JoinHandle<()>,
}

/// Owns the push subscriptions and the fallback tick of one session.
#[derive(Debug)]
pub struct ChangeNotifier {
    channel: Arc<dyn PushChannel>,
    config: NotifierConfig,
    io_timeout: Duration,
    events: mpsc::Sender<SessionEvent>,
    subscriptions: HashMap<ObjectType, ActiveSubscription>,
    /// Last change marker delivered per object type.
    markers: Arc<DashMap<ObjectType, i64>>,
    degraded: BTreeSet<ObjectType>,
    tick: Option<FallbackTick>,
}

impl ChangeNotifier {
    pub fn new(
        channel: Arc<dyn PushChannel>,
        config: NotifierConfig,
        io_timeout: Duration,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            channel,
            config,
            io_timeout,
            events,
            subscriptions: HashMap::new(),
            markers: Arc::new(DashMap::new()),
            degraded: BTreeSet::new(),
            tick: None,
        }
    }

    /// Subscribe for `object_type` unless a subscription already exists.
    ///
    /// Resumes from the last marker seen for the type, or from the
    /// configured replay marker on first subscription. A failure leaves the
    /// type degraded and is returned as `SubscriptionDegraded`.
    pub async fn subscribe(&mut self, object_type: &ObjectType) -> AppResult<()> {
        if self.subscriptions.contains_key(object_type) {
            return Ok(());
        }

        let since = self
            .markers
            .get(object_type)
            .map(|marker| *marker)
            .unwrap_or(self.config.replay_from);

        let result = with_deadline(
            self.io_timeout,
            "channel.subscribe",
            self.channel.subscribe(&self.config.channel, since),
        )
        .await;

        match result {
            Ok(subscribed) => {
                let forwarder = tokio::spawn(forward(
                    object_type.clone(),
                    subscribed.backlog,
                    subscribed.receiver,
                    Arc::clone(&self.markers),
                    self.events.clone(),
                ));
                self.subscriptions.insert(
                    object_type.clone(),
                    ActiveSubscription {
                        subscription: subscribed.subscription,
                        forwarder,
                    },
                );
                if self.degraded.remove(object_type) {
                    info!(object_type = %object_type, since, "Push subscription recovered");
                } else {
                    info!(object_type = %object_type, channel = %self.config.channel, since, "Subscribed to push channel");
                }
                Ok(())
            }
            Err(e) => {
                self.degraded.insert(object_type.clone());
                warn!(object_type = %object_type, error = %e, "Push subscription failed, relying on fallback tick");
                Err(AppError::with_source(
                    ErrorKind::SubscriptionDegraded,
                    format!("push channel unavailable for {object_type}"),
                    e,
                ))
            }
        }
    }

    /// Drop the subscription of `object_type` and mark it degraded.
    pub async fn mark_degraded(&mut self, object_type: &ObjectType) {
        if let Some(active) = self.subscriptions.remove(object_type) {
            self.release(active).await;
        }
        self.degraded.insert(object_type.clone());
        warn!(object_type = %object_type, "Push subscription degraded");
    }

    /// Retry every degraded subscription. Returns the errors of those that
    /// are still degraded.
    pub async fn resubscribe_degraded(&mut self) -> Vec<AppError> {
        let pending: Vec<ObjectType> = self.degraded.iter().cloned().collect();
        let mut errors = Vec::new();
        for object_type in pending {
            if let Err(e) = self.subscribe(&object_type).await {
                errors.push(e);
            }
        }
        errors
    }

    /// Start the fallback tick if it is not running.
    pub fn ensure_tick(&mut self) {
        let running = self.tick.as_ref().is_some_and(FallbackTick::is_running);
        if !running {
            self.tick = Some(FallbackTick::start(
                self.config.tick_interval(),
                self.events.clone(),
            ));
        }
    }

    /// Whether the fallback tick is running.
    pub fn tick_running(&self) -> bool {
        self.tick.as_ref().is_some_and(FallbackTick::is_running)
    }

    pub fn state(&self, object_type: &ObjectType) -> SubscriptionState {
        if self.subscriptions.contains_key(object_type) {
            SubscriptionState::Active
        } else if self.degraded.contains(object_type) {
            SubscriptionState::Degraded
        } else {
            SubscriptionState::Inactive
        }
    }

    /// Last change marker delivered for `object_type`.
    pub fn last_marker(&self, object_type: &ObjectType) -> Option<i64> {
        self.markers.get(object_type).map(|marker| *marker)
    }

    /// Announce a change to `record`'s presence entry to other clients.
    pub async fn publish(&self, record: &RecordKey) -> AppResult<i64> {
        with_deadline(
            self.io_timeout,
            "channel.publish",
            self.channel.publish(&self.config.channel, record),
        )
        .await
    }

    /// Unsubscribe everything and stop the tick. Safe to call more than once.
    pub async fn teardown(&mut self) {
        let active: Vec<ActiveSubscription> =
            self.subscriptions.drain().map(|(_, active)| active).collect();
        for subscription in active {
            self.release(subscription).await;
        }
        self.degraded.clear();

        if let Some(tick) = self.tick.take() {
            tick.cancel();
        }
    }

    async fn release(&self, active: ActiveSubscription) {
        active.forwarder.abort();
        let result = with_deadline(
            self.io_timeout,
            "channel.unsubscribe",
            self.channel.unsubscribe(&active.subscription),
        )
        .await;
        match result {
            Ok(()) => debug!(subscription = %active.subscription.id, "Unsubscribed"),
            Err(e) => warn!(subscription = %active.subscription.id, error = %e, "Unsubscribe failed"),
        }
    }
}

/// Forward backlog then live events of `object_type` to the session.
async fn forward(
    object_type: ObjectType,
    backlog: Vec<ChangeEvent>,
    mut receiver: broadcast::Receiver<ChangeEvent>,
    markers: Arc<DashMap<ObjectType, i64>>,
    events: mpsc::Sender<SessionEvent>,
) {
    for event in backlog {
        if !deliver(&object_type, event, &markers, &events).await {
            return;
        }
    }

    loop {
        match receiver.recv().await {
            Ok(event) => {
                if !deliver(&object_type, event, &markers, &events).await {
                    break;
                }
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(object_type = %object_type, missed, "Push receiver lagged, fallback tick will catch up");
            }
            Err(RecvError::Closed) => {
                let _ = events.send(SessionEvent::ChannelClosed(object_type.clone())).await;
                break;
            }
        }
    }

    debug!(object_type = %object_type, "Push forwarder stopped");
}

/// Queue `event` if it matches and is new. Returns `false` once the
/// session is gone.
async fn deliver(
    object_type: &ObjectType,
    event: ChangeEvent,
    markers: &DashMap<ObjectType, i64>,
    events: &mpsc::Sender<SessionEvent>,
) -> bool {
    if event.object_type != *object_type {
        return true;
    }

    let seen = markers.get(object_type).map(|marker| *marker);
    if seen.is_some_and(|seen| event.change_marker <= seen) {
        return true;
    }
    markers.insert(object_type.clone(), event.change_marker);

    events.send(SessionEvent::Push(event)).await.is_ok()
}

//! The watch session: one event loop per client.
//!
//! Every signal (host tab events, push events, fallback ticks, teardown)
//! is queued on a single channel and handled one at a time, so no two
//! reconciliation passes ever overlap and no record has two writes in
//! flight from the same client.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

use watch_core::config::AppConfig;
use watch_core::config::presence::PresenceConfig;
use watch_core::error::{AppError, ErrorKind};
use watch_core::result::AppResult;
use watch_core::traits::channel::PushChannel;
use watch_core::traits::profile::ProfileLookup;
use watch_core::traits::store::PresenceStore;
use watch_core::traits::tabs::TabSource;
use watch_core::types::{ChangeEvent, ObjectType, RecordKey, UserId};

use crate::channel::ChangeNotifier;
use crate::io::with_deadline;
use crate::message::{OutboundUpdate, SessionEvent};
use crate::presence::{PassReport, Reconciler};
use crate::projector::{WatcherList, WatcherProjector};
use crate::snapshot::{SnapshotResolver, TabSnapshot};

/// External systems a session talks to.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub store: Arc<dyn PresenceStore>,
    pub tabs: Arc<dyn TabSource>,
    pub channel: Arc<dyn PushChannel>,
    pub profiles: Arc<dyn ProfileLookup>,
}

/// Cloneable handle for feeding host signals into a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
}

impl SessionHandle {
    async fn send(&self, event: SessionEvent) -> AppResult<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| AppError::internal("watch session has ended"))
    }

    /// A tab was opened, closed or focused.
    pub async fn snapshot_changed(&self) -> AppResult<()> {
        self.send(SessionEvent::Snapshot).await
    }

    /// The current tab was reloaded.
    pub async fn tab_refreshed(&self) -> AppResult<()> {
        self.send(SessionEvent::TabRefreshed).await
    }

    /// A tab bound to `record` was closed.
    pub async fn tab_closed(&self, record: RecordKey) -> AppResult<()> {
        self.send(SessionEvent::TabClosed(record)).await
    }

    /// Inject a change event from an external push transport.
    pub async fn push(&self, event: ChangeEvent) -> AppResult<()> {
        self.send(SessionEvent::Push(event)).await
    }

    /// End the session. Does nothing if it has already ended.
    pub async fn shutdown(&self) {
        let _ = self.events.send(SessionEvent::Shutdown).await;
    }
}

/// One client's presence engine.
#[derive(Debug)]
pub struct WatchSession {
    user: UserId,
    object_types: Vec<ObjectType>,
    config: PresenceConfig,
    store: Arc<dyn PresenceStore>,
    tabs: Arc<dyn TabSource>,
    resolver: SnapshotResolver,
    reconciler: Reconciler,
    notifier: ChangeNotifier,
    projector: WatcherProjector,
    events_tx: mpsc::Sender<SessionEvent>,
    events: mpsc::Receiver<SessionEvent>,
    updates: mpsc::Sender<OutboundUpdate>,
    /// Last watcher list sent to the UI.
    shown: Option<WatcherList>,
    torn_down: bool,
}

impl WatchSession {
    /// Build a session for `user` interested in `object_types`.
    ///
    /// With no object types given, the configured default object type is
    /// used. Returns the session and the receiver of UI updates.
    pub fn new(
        config: &AppConfig,
        user: UserId,
        object_types: Vec<ObjectType>,
        collaborators: Collaborators,
    ) -> AppResult<(Self, mpsc::Receiver<OutboundUpdate>)> {
        let fallback_type = config
            .presence
            .default_object_type
            .as_deref()
            .map(ObjectType::new)
            .transpose()?;

        let mut object_types = object_types;
        if object_types.is_empty() {
            object_types.extend(fallback_type.clone());
        }
        object_types.sort();
        object_types.dedup();

        let buffer = config.notifier.event_buffer.max(1);
        let (events_tx, events) = mpsc::channel(buffer);
        let (updates, updates_rx) = mpsc::channel(buffer);

        let reconciler = Reconciler::new(
            user.clone(),
            Arc::clone(&collaborators.store),
            config.presence.clone(),
        );
        let notifier = ChangeNotifier::new(
            collaborators.channel,
            config.notifier.clone(),
            config.presence.io_timeout(),
            events_tx.clone(),
        );
        let projector = WatcherProjector::new(user.clone(), collaborators.profiles, &config.presence);

        let session = Self {
            user,
            object_types,
            config: config.presence.clone(),
            store: collaborators.store,
            tabs: collaborators.tabs,
            resolver: SnapshotResolver::new(fallback_type),
            reconciler,
            notifier,
            projector,
            events_tx,
            events,
            updates,
            shown: None,
            torn_down: false,
        };
        Ok((session, updates_rx))
    }

    /// A handle for feeding events into this session.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            events: self.events_tx.clone(),
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn projector(&self) -> &WatcherProjector {
        &self.projector
    }

    /// Check the shared store, subscribe to push events, start the
    /// fallback tick and run the initial full sync.
    ///
    /// Fails only when the shared store has no cache capability at all.
    pub async fn start(&mut self) -> AppResult<()> {
        self.check_capability().await?;

        for object_type in self.object_types.clone() {
            if let Err(e) = self.notifier.subscribe(&object_type).await {
                self.emit(OutboundUpdate::Degraded {
                    kind: e.kind,
                    detail: e.message,
                });
            }
        }
        self.notifier.ensure_tick();

        info!(user = %self.user, object_types = ?self.object_types, "Watch session started");
        self.sync().await;
        Ok(())
    }

    async fn check_capability(&self) -> AppResult<()> {
        let result = with_deadline(
            self.config.io_timeout(),
            "store.health_check",
            self.store.health_check(),
        )
        .await;

        match result {
            Ok(true) => Ok(()),
            Ok(false) => {
                let e = AppError::cache_capability("shared presence store is not available");
                error!(user = %self.user, error = %e, "Cannot start watch session");
                Err(e)
            }
            Err(e) if e.is_transient() => {
                warn!(user = %self.user, error = %e, "Store health check failed, starting anyway");
                Ok(())
            }
            Err(e) => {
                error!(user = %self.user, error = %e, "Cannot start watch session");
                Err(e)
            }
        }
    }

    /// Process queued events in arrival order until shutdown, then tear
    /// down.
    pub async fn run(&mut self) {
        while let Some(event) = self.events.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }
        self.teardown().await;
    }

    /// Handle events already queued without waiting for new ones.
    /// Returns the number handled; stops early on shutdown.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            handled += 1;
            if !self.handle_event(event).await {
                self.teardown().await;
                break;
            }
        }
        handled
    }

    /// Handle one event. Returns `false` on shutdown.
    pub async fn handle_event(&mut self, event: SessionEvent) -> bool {
        if self.torn_down {
            return false;
        }

        match event {
            SessionEvent::Snapshot | SessionEvent::TabRefreshed => {
                self.sync().await;
            }
            SessionEvent::Tick => {
                for e in self.notifier.resubscribe_degraded().await {
                    debug!(error = %e, "Push subscription still degraded");
                }
                self.notifier.ensure_tick();
                self.sync().await;
            }
            SessionEvent::Push(event) => self.on_push(event).await,
            SessionEvent::TabClosed(key) => {
                if let Ok(true) = self.reconciler.teardown(&key).await {
                    self.announce(std::slice::from_ref(&key)).await;
                }
                self.refresh_projection().await;
            }
            SessionEvent::ChannelClosed(object_type) => {
                self.notifier.mark_degraded(&object_type).await;
                let e = AppError::subscription_degraded(format!("push channel closed for {object_type}"));
                self.emit(OutboundUpdate::Degraded {
                    kind: e.kind,
                    detail: e.message,
                });
            }
            SessionEvent::Shutdown => return false,
        }
        true
    }

    /// Run one reconciliation pass against the host's current tabs.
    pub async fn sync(&mut self) -> PassReport {
        let snapshot = self.snapshot().await;
        let report = self.reconciler.reconcile(&snapshot).await;

        if !report.is_clean() {
            warn!(user = %self.user, failed = report.failed.len(), "Reconciliation pass incomplete");
        } else if report.writes() > 0 {
            debug!(user = %self.user, writes = report.writes(), "Reconciliation pass wrote");
        }

        self.announce(&report.written).await;
        self.refresh_projection().await;
        report
    }

    async fn snapshot(&self) -> TabSnapshot {
        match with_deadline(self.config.io_timeout(), "tabs.open_tabs", self.tabs.open_tabs()).await {
            Ok(tabs) => self.resolver.resolve(&tabs),
            Err(e) => {
                let e = AppError::with_source(ErrorKind::SnapshotUnavailable, "host tab enumeration failed", e);
                warn!(user = %self.user, error = %e, "Treating snapshot as no open tabs");
                TabSnapshot::empty()
            }
        }
    }

    async fn on_push(&mut self, event: ChangeEvent) {
        let key = event.key();
        if self.reconciler.focused() == Some(&key) {
            debug!(record = %key, marker = event.change_marker, "Focused record changed");
            self.refresh_projection().await;
        } else {
            self.emit(OutboundUpdate::Ambient(event));
        }
    }

    /// Tell other clients that these entries changed. Best-effort.
    async fn announce(&self, keys: &[RecordKey]) {
        for key in keys {
            if let Err(e) = self.notifier.publish(key).await {
                warn!(record = %key, error = %e, op = "publish", "Change announcement failed");
            }
        }
    }

    /// Re-read the focused record's entry and send the watcher list if it
    /// changed. On a failed read the last list stays on screen.
    async fn refresh_projection(&mut self) {
        let list = match self.reconciler.focused().cloned() {
            None => self.projector.project(None, Utc::now()).await,
            Some(key) => {
                match with_deadline(self.config.io_timeout(), "store.get", self.store.get(&key)).await {
                    Ok(entry) => self.projector.project(entry.as_ref(), Utc::now()).await,
                    Err(e) => {
                        warn!(record = %key, error = %e, "Keeping last watcher list");
                        return;
                    }
                }
            }
        };

        if self.shown.as_ref() != Some(&list) {
            self.shown = Some(list.clone());
            self.emit(OutboundUpdate::Watchers(list));
        }
    }

    fn emit(&self, update: OutboundUpdate) {
        match self.updates.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("UI update queue full, dropping update"),
            Err(TrySendError::Closed(_)) => debug!("UI receiver dropped"),
        }
    }

    /// Drain every watch, unsubscribe and stop the tick. Safe to call more
    /// than once.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        let report = self.reconciler.drain().await;
        self.announce(&report.written).await;
        self.notifier.teardown().await;

        info!(
            user = %self.user,
            unwatched = report.unwatched.len(),
            failed = report.failed.len(),
            "Watch session ended"
        );
    }

    /// Whether the session has been torn down.
    pub fn is_closed(&self) -> bool {
        self.torn_down
    }
}

//! The presence reconciliation pass.
//!
//! Compares the desired viewing set (the focused record of the latest
//! snapshot) against what this client believes it has marked, and issues
//! the minimal set of store writes to close the gap.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use watch_core::config::presence::PresenceConfig;
use watch_core::error::ErrorKind;
use watch_core::result::AppResult;
use watch_core::traits::store::PresenceStore;
use watch_core::types::{RecordKey, UserId};

use super::dedup::WriteDeduplicator;
use super::state::ViewingState;
use crate::io::with_deadline;
use crate::snapshot::TabSnapshot;

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Records transitioned to watching.
    pub watched: Vec<RecordKey>,
    /// Records transitioned to unwatched.
    pub unwatched: Vec<RecordKey>,
    /// Watched records whose mark was re-stamped.
    pub refreshed: Vec<RecordKey>,
    /// Watched records left alone because the mark is known fresh.
    pub skipped: Vec<RecordKey>,
    /// Transitions that failed and will be retried on the next pass.
    pub failed: Vec<(RecordKey, ErrorKind)>,
    /// Focused record not watched yet because an older mark could not be
    /// removed first.
    pub deferred: Vec<RecordKey>,
    /// Records whose entry was written (put or remove).
    pub written: Vec<RecordKey>,
}

impl PassReport {
    /// Number of store writes issued.
    pub fn writes(&self) -> usize {
        self.written.len()
    }

    /// Whether nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of making sure our own mark is present on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// A fresh mark was already there.
    Fresh,
    /// The mark was absent or stale and has been written.
    Written,
}

/// Owns the [`ViewingState`] of one client and reconciles it against the
/// shared presence store.
#[derive(Debug)]
pub struct Reconciler {
    user: UserId,
    store: Arc<dyn PresenceStore>,
    config: PresenceConfig,
    state: ViewingState,
    dedup: WriteDeduplicator,
}

impl Reconciler {
    /// Create a reconciler for `user` with an empty viewing state.
    pub fn new(user: UserId, store: Arc<dyn PresenceStore>, config: PresenceConfig) -> Self {
        let dedup = WriteDeduplicator::new(config.refresh_window());
        Self {
            user,
            store,
            config,
            state: ViewingState::default(),
            dedup,
        }
    }

    /// The local user.
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Current viewing state.
    pub fn state(&self) -> &ViewingState {
        &self.state
    }

    /// The focused record of the last pass.
    pub fn focused(&self) -> Option<&RecordKey> {
        self.state.focused.as_ref()
    }

    /// Run one reconciliation pass against `snapshot`.
    ///
    /// Stale records are unwatched before the focused record is watched so
    /// the user never shows up on two records at once. If any unwatch
    /// fails, a newly focused record is deferred to the next pass. Failures
    /// are recorded in the report and leave the viewing state as it was.
    pub async fn reconcile(&mut self, snapshot: &TabSnapshot) -> PassReport {
        let mut report = PassReport::default();
        let desired = snapshot.focused().cloned();

        if self.state.focused != desired {
            debug!(
                user = %self.user,
                from = ?self.state.focused.as_ref().map(ToString::to_string),
                to = ?desired.as_ref().map(ToString::to_string),
                "Focus changed"
            );
        }
        self.state.focused = desired.clone();

        for key in self.state.stale(desired.as_ref()) {
            match self.unwatch(&key).await {
                Ok(wrote) => {
                    if wrote {
                        report.written.push(key.clone());
                    }
                    self.state.watched.remove(&key);
                    self.dedup.forget(&key);
                    info!(user = %self.user, record = %key, "Unwatched record");
                    report.unwatched.push(key);
                }
                Err(e) => {
                    warn!(user = %self.user, record = %key, op = "unwatch", error = %e, "Transition failed, retrying next pass");
                    report.failed.push((key, e.kind));
                }
            }
        }

        if let Some(key) = desired {
            let blocked = !report.failed.is_empty() && !self.state.is_watching(&key);
            if blocked {
                debug!(user = %self.user, record = %key, "Older mark still present, deferring watch");
                report.deferred.push(key);
            } else {
                self.confirm(key, &mut report).await;
            }
        }

        self.dedup.cleanup();
        report
    }

    async fn confirm(&mut self, key: RecordKey, report: &mut PassReport) {
        let already = self.state.is_watching(&key);

        if already && self.dedup.is_recent(&key) {
            debug!(record = %key, "Mark confirmed recently, skipping");
            report.skipped.push(key);
            return;
        }

        match self.mark(&key).await {
            Ok(Mark::Written) => {
                report.written.push(key.clone());
                self.state.watched.insert(key.clone());
                self.dedup.record(&key);
                if already {
                    debug!(user = %self.user, record = %key, "Refreshed watch mark");
                    report.refreshed.push(key);
                } else {
                    info!(user = %self.user, record = %key, "Watching record");
                    report.watched.push(key);
                }
            }
            Ok(Mark::Fresh) => {
                self.state.watched.insert(key.clone());
                self.dedup.record(&key);
                if already {
                    report.skipped.push(key);
                } else {
                    info!(user = %self.user, record = %key, "Watching record (mark already present)");
                    report.watched.push(key);
                }
            }
            Err(e) => {
                warn!(user = %self.user, record = %key, op = "watch", error = %e, "Transition failed, retrying next pass");
                report.failed.push((key, e.kind));
            }
        }
    }

    /// Make sure our mark on `key` exists and is younger than the refresh
    /// window. Reads first; writes only when needed.
    async fn mark(&self, key: &RecordKey) -> AppResult<Mark> {
        let deadline = self.config.io_timeout();
        let current = with_deadline(deadline, "store.get", self.store.get(key)).await?;
        let now = Utc::now();

        let mut entry = current.unwrap_or_default();
        if let Some(seen) = entry.last_seen(&self.user) {
            let age = now.signed_duration_since(seen);
            if age.to_std().is_ok_and(|age| age < self.config.refresh_window()) {
                return Ok(Mark::Fresh);
            }
        }

        entry.mark(self.user.clone(), now);
        with_deadline(deadline, "store.put", self.store.put(key, &entry)).await?;
        Ok(Mark::Written)
    }

    /// Remove our mark from `key`. Returns whether a write was issued.
    ///
    /// An absent bucket is left absent and an entry without our mark is
    /// left untouched, so a late unwatch never recreates a removed bucket.
    async fn unwatch(&self, key: &RecordKey) -> AppResult<bool> {
        let deadline = self.config.io_timeout();
        let Some(mut entry) = with_deadline(deadline, "store.get", self.store.get(key)).await?
        else {
            return Ok(false);
        };

        if !entry.evict(&self.user) {
            return Ok(false);
        }

        if entry.is_empty() && self.config.evict_empty_buckets {
            with_deadline(deadline, "store.remove", self.store.remove(key)).await?;
        } else {
            with_deadline(deadline, "store.put", self.store.put(key, &entry)).await?;
        }
        Ok(true)
    }

    /// Unconditionally forget `key` and try to remove our mark from it.
    ///
    /// The viewing state is updated before the write, so a failed write
    /// is logged and not retried.
    pub async fn teardown(&mut self, key: &RecordKey) -> AppResult<bool> {
        self.state.watched.remove(key);
        self.dedup.forget(key);
        if self.state.focused.as_ref() == Some(key) {
            self.state.focused = None;
        }

        match self.unwatch(key).await {
            Ok(wrote) => {
                info!(user = %self.user, record = %key, "Tore down watch");
                Ok(wrote)
            }
            Err(e) => {
                warn!(user = %self.user, record = %key, op = "teardown", error = %e, "Best-effort unwatch failed");
                Err(e)
            }
        }
    }

    /// Tear down every watched record. Used when the session ends.
    pub async fn drain(&mut self) -> PassReport {
        let mut report = PassReport::default();
        self.state.focused = None;

        let keys: Vec<RecordKey> = self.state.watched.iter().cloned().collect();
        for key in keys {
            match self.teardown(&key).await {
                Ok(wrote) => {
                    if wrote {
                        report.written.push(key.clone());
                    }
                    report.unwatched.push(key);
                }
                Err(e) => report.failed.push((key, e.kind)),
            }
        }
        report
    }
}

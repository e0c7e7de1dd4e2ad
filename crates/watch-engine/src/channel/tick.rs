//! Fixed-interval fallback tick.

use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::message::SessionEvent;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Periodically queues [`SessionEvent::Tick`] so the session re-syncs even
/// when push delivery is missing or late.
///
/// The tick never blocks: if the session queue is full the tick is
/// dropped, since a pending event will reconcile anyway.
#[derive(Debug)]
pub struct FallbackTick {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl FallbackTick {
    /// Spawn the tick task. The first tick fires one `period` from now.
    /// A zero `period` is raised to 1ms.
    pub fn start(period: Duration, events: mpsc::Sender<SessionEvent>) -> Self {
        let period = period.max(MIN_PERIOD);
        let (cancel, mut cancelled) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.changed() => {
                        if *cancelled.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match events.try_send(SessionEvent::Tick) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                trace!("Session queue full, dropping tick");
                            }
                            Err(TrySendError::Closed(_)) => break,
                        }
                    }
                }
            }

            debug!("Fallback tick stopped");
        });

        debug!(?period, "Fallback tick started");
        Self { cancel, handle }
    }

    /// Stop the tick. Safe to call more than once.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Whether the tick task is still alive.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for FallbackTick {
    fn drop(&mut self) {
        self.cancel();
    }
}

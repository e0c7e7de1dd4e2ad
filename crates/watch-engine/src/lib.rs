//! # watch-engine
//!
//! Presence reconciliation engine for RecordWatch. Provides:
//!
//! - Resolution of the host's nested tab enumeration into a flat snapshot
//!   with at most one focused record
//! - The reconciler that turns snapshot changes into the minimal set of
//!   watch/unwatch writes against the shared presence store
//! - A change notifier owning push-channel subscriptions and the fallback tick
//! - The projector that turns a presence entry into a displayable watcher list
//! - A session event loop that serializes every signal through one task
//! - In-process collaborators for single-node use and tests

pub mod bridge;
pub mod channel;
pub mod host;
pub mod io;
pub mod message;
pub mod presence;
pub mod projector;
pub mod session;
pub mod snapshot;

pub use channel::notifier::ChangeNotifier;
pub use message::{OutboundUpdate, SessionEvent};
pub use presence::reconciler::{PassReport, Reconciler};
pub use projector::{WatcherList, WatcherProjector, WatcherView};
pub use session::{Collaborators, SessionHandle, WatchSession};
pub use snapshot::{SnapshotResolver, TabSnapshot};

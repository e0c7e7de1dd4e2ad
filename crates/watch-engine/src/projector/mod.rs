//! Projection of a presence entry into the watcher list shown to the user.

pub mod projection;
pub mod view;

pub use projection::WatcherProjector;
pub use view::{WatcherList, WatcherStatus, WatcherView};

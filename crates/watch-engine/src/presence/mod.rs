//! Presence reconciliation: the local viewing state and the pass that
//! brings the shared store in line with it.

pub mod dedup;
pub mod reconciler;
pub mod state;

pub use dedup::WriteDeduplicator;
pub use reconciler::{PassReport, Reconciler};
pub use state::ViewingState;

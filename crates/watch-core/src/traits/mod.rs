//! Collaborator traits defined in `watch-core` and implemented by other crates.

pub mod cache;
pub mod channel;
pub mod profile;
pub mod store;
pub mod tabs;

pub use cache::CacheProvider;
pub use channel::{PushChannel, Subscribed, Subscription};
pub use profile::ProfileLookup;
pub use store::PresenceStore;
pub use tabs::TabSource;

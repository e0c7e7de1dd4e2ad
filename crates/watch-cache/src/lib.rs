//! # watch-cache
//!
//! Backends for the shared presence store. Supports two modes:
//!
//! - **memory**: In-process cache using [moka](https://crates.io/crates/moka),
//!   shared by every session in the same process
//! - **redis**: Redis-backed cache using the [redis](https://crates.io/crates/redis)
//!   crate, shared across processes
//!
//! The provider is selected at runtime based on configuration, and
//! [`CachePresenceStore`] turns any provider into a
//! [`PresenceStore`](watch_core::traits::PresenceStore).

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod presence;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use presence::CachePresenceStore;
pub use provider::CacheManager;

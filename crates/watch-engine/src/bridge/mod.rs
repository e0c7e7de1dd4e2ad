//! Push channel transports.

pub mod memory_pubsub;

pub use memory_pubsub::MemoryPushChannel;

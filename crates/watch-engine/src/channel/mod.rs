//! Push-channel subscriptions and the fallback tick.

pub mod notifier;
pub mod tick;

pub use notifier::{ChangeNotifier, SubscriptionState};
pub use tick::FallbackTick;

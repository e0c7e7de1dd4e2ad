//! Shared domain types: identifiers, presence entries, tabs, events, profiles.

pub mod event;
pub mod id;
pub mod presence;
pub mod profile;
pub mod record;
pub mod tab;

pub use event::ChangeEvent;
pub use id::{ObjectType, RecordId, UserId};
pub use presence::PresenceEntry;
pub use profile::UserProfile;
pub use record::RecordKey;
pub use tab::TabDescriptor;

//! In-process stand-ins for the host platform's tab API and identity
//! service. Used by the binary and by tests.

pub mod profiles;
pub mod tabs;

pub use profiles::ProfileDirectory;
pub use tabs::StaticTabSource;

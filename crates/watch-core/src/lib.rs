//! # watch-core
//!
//! Core crate for RecordWatch. Contains the record/user identifiers, the
//! shared presence entry model, the collaborator traits the engine talks
//! to (presence store, cache, tab source, push channel, profile lookup),
//! configuration schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other RecordWatch crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;

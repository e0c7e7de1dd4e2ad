//! Unified error types for RecordWatch.
//!
//! Every collaborator failure is mapped into [`AppError`] so the engine can
//! classify it by [`ErrorKind`] and decide whether to retry on the next
//! pass or give up.

use std::fmt;
use thiserror::Error;

/// Failure category. The engine's retry decisions key off this alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Shared presence store unreachable or rejected the call.
    StoreUnavailable,
    /// Push subscription failed or its delivery stopped.
    SubscriptionDegraded,
    /// Host could not enumerate open tabs.
    SnapshotUnavailable,
    /// Fewer profiles came back than were asked for.
    ProfileLookupPartial,
    /// A collaborator missed its deadline.
    Timeout,
    /// No shared cache exists for this process.
    CacheCapability,
    Serialization,
    Configuration,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::SubscriptionDegraded => "SUBSCRIPTION_DEGRADED",
            Self::SnapshotUnavailable => "SNAPSHOT_UNAVAILABLE",
            Self::ProfileLookupPartial => "PROFILE_LOOKUP_PARTIAL",
            Self::Timeout => "TIMEOUT",
            Self::CacheCapability => "CACHE_CAPABILITY",
            Self::Serialization => "SERIALIZATION",
            Self::Configuration => "CONFIGURATION",
            Self::Validation => "VALIDATION",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `AppError::<kind>(message)` constructor per listed kind.
macro_rules! kind_constructors {
    ($($name:ident => $kind:ident),* $(,)?) => {
        $(
            #[doc = concat!("An error of kind [`ErrorKind::", stringify!($kind), "`].")]
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        )*
    };
}

/// Error returned by every fallible operation in RecordWatch.
///
/// Collaborator errors are wrapped with [`AppError::with_source`] at the
/// boundary where their kind is known.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Keep `source` as the cause so it shows up in `{:?}` logs.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    kind_constructors! {
        store_unavailable => StoreUnavailable,
        subscription_degraded => SubscriptionDegraded,
        snapshot_unavailable => SnapshotUnavailable,
        profile_lookup_partial => ProfileLookupPartial,
        timeout => Timeout,
        cache_capability => CacheCapability,
        configuration => Configuration,
        validation => Validation,
        internal => Internal,
    }

    /// Whether the engine should simply retry on its next pass.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::StoreUnavailable
                | ErrorKind::SubscriptionDegraded
                | ErrorKind::SnapshotUnavailable
                | ErrorKind::ProfileLookupPartial
                | ErrorKind::Timeout
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

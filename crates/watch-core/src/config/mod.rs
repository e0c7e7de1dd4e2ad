//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a default so that an empty file is a
//! valid configuration.

pub mod cache;
pub mod logging;
pub mod notifier;
pub mod presence;

use serde::{Deserialize, Serialize};

use self::cache::CacheConfig;
use self::logging::LoggingConfig;
use self::notifier::NotifierConfig;
use self::presence::PresenceConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reconciler and projector settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Push channel and fallback tick settings.
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Shared cache backend settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `RECORD_WATCH__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("RECORD_WATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.notifier.tick_interval_ms == 0 {
            return Err(AppError::configuration("notifier.tick_interval_ms must be greater than 0"));
        }
        if self.notifier.event_buffer == 0 {
            return Err(AppError::configuration("notifier.event_buffer must be greater than 0"));
        }
        if self.presence.io_timeout_ms == 0 {
            return Err(AppError::configuration("presence.io_timeout_ms must be greater than 0"));
        }
        let threshold = i64::try_from(self.presence.active_threshold_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds);
        if threshold.is_none() {
            return Err(AppError::configuration(format!(
                "presence.active_threshold_seconds is out of range: {}",
                self.presence.active_threshold_seconds
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cache::CacheBackend;
    use crate::config::logging::LogFormat;
    use crate::error::ErrorKind;

    #[test]
    fn test_empty_source_yields_defaults() {
        let config: AppConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.presence.refresh_seconds, 30);
        assert_eq!(config.notifier.tick_interval_ms, 5000);
        assert_eq!(config.notifier.replay_from, -1);
        assert_eq!(config.cache.provider, CacheBackend::Memory);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_overrides() {
        let toml = r#"
            [presence]
            default_object_type = "Case"
            evict_empty_buckets = true

            [notifier]
            tick_interval_ms = 1000
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.presence.default_object_type.as_deref(), Some("Case"));
        assert!(config.presence.evict_empty_buckets);
        assert_eq!(config.notifier.tick_interval_ms, 1000);
        assert_eq!(config.notifier.channel, "/event/Record_Watcher__e");
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_tick_interval_is_rejected() {
        let mut config = AppConfig::default();
        config.notifier.tick_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_huge_active_threshold_is_rejected() {
        let mut config = AppConfig::default();
        config.presence.active_threshold_seconds = u64::MAX;
        assert!(config.validate().is_err());

        config.presence.active_threshold_seconds = i64::MAX as u64;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_and_format_parse_lowercase() {
        let toml = r#"
            [cache]
            provider = "redis"

            [logging]
            format = "json"
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.cache.provider, CacheBackend::Redis);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let toml = r#"
            [cache]
            provider = "memcached"
        "#;
        let result = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>();
        assert!(result.is_err());
    }
}

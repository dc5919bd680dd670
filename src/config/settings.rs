//! Configuration settings structures for push-dispatch
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables. Every adapter section is read once at
//! initialization and treated as immutable afterwards.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};
use crate::models::Backend;

/// Minimum APN time-to-live (1 hour)
pub const MIN_APN_TIME_TO_LIVE: u64 = 60 * 60;

/// Maximum APN time-to-live (30 days, the provider's storage window)
pub const MAX_APN_TIME_TO_LIVE: u64 = 30 * 24 * 60 * 60;

/// Largest number of tokens a multicast provider accepts in one call
pub const MULTICAST_BATCH_LIMIT: usize = 1000;

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "push-dispatch".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_dispatch_concurrency() -> usize {
    30
}

fn default_adapter_concurrency() -> usize {
    50
}

fn default_sound() -> String {
    "default".to_string()
}

fn default_apn_time_to_live() -> u64 {
    60 * 60 * 24 * 2 // 48h
}

fn default_feedback_interval() -> u64 {
    300
}

fn default_notification_app_name() -> String {
    "TinyPush".to_string()
}

fn default_retry_count() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/push-dispatch.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Dispatch Configuration
// ============================================================================

/// Batch dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum provider calls in flight for one batch, across all adapters
    #[serde(default = "default_dispatch_concurrency")]
    pub concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_dispatch_concurrency(),
        }
    }
}

// ============================================================================
// APN Configuration
// ============================================================================

/// Apple Push Notification service adapter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnConfig {
    /// Whether the adapter is initialized at startup
    #[serde(default)]
    pub enabled: bool,

    /// Path to the client certificate (PEM or PKCS#12)
    #[serde(default)]
    pub cert_file: String,

    /// Path to the private key; may be the same file as the certificate
    #[serde(default)]
    pub key_file: String,

    /// Production gateway when true, sandbox otherwise
    #[serde(default)]
    pub production: bool,

    /// Maximum concurrent per-device calls of a direct send
    #[serde(default = "default_adapter_concurrency")]
    pub concurrency: usize,

    /// Sound played when a notification does not name one
    #[serde(default = "default_sound")]
    pub sound: String,

    /// Default time-to-live in seconds (never below one hour)
    #[serde(default = "default_apn_time_to_live")]
    pub time_to_live: u64,

    /// Feedback channel polling interval in seconds
    #[serde(default = "default_feedback_interval")]
    pub feedback_interval: u64,
}

impl Default for ApnConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_file: String::new(),
            key_file: String::new(),
            production: false,
            concurrency: default_adapter_concurrency(),
            sound: default_sound(),
            time_to_live: default_apn_time_to_live(),
            feedback_interval: default_feedback_interval(),
        }
    }
}

impl ApnConfig {
    /// Default time-to-live clamped between one hour and 30 days
    pub fn effective_time_to_live(&self) -> Duration {
        Duration::from_secs(
            self.time_to_live
                .clamp(MIN_APN_TIME_TO_LIVE, MAX_APN_TIME_TO_LIVE),
        )
    }

    pub fn feedback_interval(&self) -> Duration {
        Duration::from_secs(self.feedback_interval)
    }
}

// ============================================================================
// FCM / GCM Configuration
// ============================================================================

/// Configuration shared by the multicast Google backends (FCM and GCM)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticastConfig {
    /// Whether the adapter is initialized at startup
    #[serde(default)]
    pub enabled: bool,

    /// Server key used in the `Authorization` header
    #[serde(default)]
    pub server_key: String,

    /// Title of the visible notification
    #[serde(default = "default_notification_app_name")]
    pub app_name: String,

    /// Extra attempts on network errors and 5xx responses
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Hold delivery until the device wakes up
    #[serde(default)]
    pub delay_while_idle: bool,

    /// Validate requests without delivering them (dry run)
    #[serde(default)]
    pub simulate: bool,

    /// Concurrency limit advertised for this adapter
    #[serde(default = "default_adapter_concurrency")]
    pub concurrency: usize,

    /// Sound played when a notification does not name one
    #[serde(default = "default_sound")]
    pub sound: String,

    /// Default time-to-live in seconds; backend default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u64>,

    /// Provider URL override (e.g. a staging proxy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for MulticastConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_key: String::new(),
            app_name: default_notification_app_name(),
            retry_count: default_retry_count(),
            delay_while_idle: false,
            simulate: false,
            concurrency: default_adapter_concurrency(),
            sound: default_sound(),
            time_to_live: None,
            endpoint: None,
        }
    }
}

impl MulticastConfig {
    /// Default time-to-live for `backend`: two weeks on FCM, four weeks on GCM
    pub fn time_to_live_for(&self, backend: Backend) -> Duration {
        let fallback = match backend {
            Backend::Gcm => 60 * 60 * 24 * 28,
            _ => 60 * 60 * 24 * 7 * 2,
        };
        Duration::from_secs(self.time_to_live.unwrap_or(fallback))
    }
}

// ============================================================================
// Logger Settings (compatible with LoggerConfig)
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert LoggerSettings to the runtime LoggerConfig
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console_config = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file_config = self.file.into_file_config()?;

        LoggerConfig::new(console_config, file_config, self.level).map_err(|e| {
            ConfigError::ValidationError {
                field: "logger".to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl FileSettings {
    /// Convert FileSettings to FileConfig
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: e.to_string(),
            })?;

        Ok(FileConfig {
            enabled: self.enabled,
            path: PathBuf::from(self.path),
            append: self.append,
            format,
        })
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete push-dispatch settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application information
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Batch dispatcher configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// APN adapter configuration
    #[serde(default)]
    pub apn: ApnConfig,

    /// FCM adapter configuration
    #[serde(default)]
    pub fcm: MulticastConfig,

    /// GCM adapter configuration
    #[serde(default)]
    pub gcm: MulticastConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ========================================================================
    // Arbitrary implementations for property-based testing
    // ========================================================================

    fn arb_apn_config() -> impl Strategy<Value = ApnConfig> {
        (
            any::<bool>(),
            prop_oneof![Just("/etc/push/apn.pem".to_string()), Just(String::new())],
            any::<bool>(),
            1usize..=200usize,
            prop_oneof![Just("default".to_string()), Just("chime.caf".to_string())],
            3600u64..=604_800u64,
            60u64..=3600u64,
        )
            .prop_map(
                |(enabled, file, production, concurrency, sound, time_to_live, feedback_interval)| {
                    ApnConfig {
                        enabled,
                        cert_file: file.clone(),
                        key_file: file,
                        production,
                        concurrency,
                        sound,
                        time_to_live,
                        feedback_interval,
                    }
                },
            )
    }

    fn arb_multicast_config() -> impl Strategy<Value = MulticastConfig> {
        (
            any::<bool>(),
            "[A-Za-z0-9_-]{0,40}",
            "[A-Za-z][A-Za-z0-9 ]{0,20}",
            0u32..=10u32,
            any::<bool>(),
            any::<bool>(),
            1usize..=200usize,
            proptest::option::of(60u64..=2_419_200u64),
        )
            .prop_map(
                |(
                    enabled,
                    server_key,
                    app_name,
                    retry_count,
                    delay_while_idle,
                    simulate,
                    concurrency,
                    time_to_live,
                )| MulticastConfig {
                    enabled,
                    server_key,
                    app_name,
                    retry_count,
                    delay_while_idle,
                    simulate,
                    concurrency,
                    sound: default_sound(),
                    time_to_live,
                    endpoint: None,
                },
            )
    }

    fn arb_logger_settings() -> impl Strategy<Value = LoggerSettings> {
        (
            prop_oneof![
                Just("trace".to_string()),
                Just("debug".to_string()),
                Just("info".to_string()),
                Just("warn".to_string()),
                Just("error".to_string()),
            ],
            any::<bool>(),
            any::<bool>(),
            prop_oneof![
                Just("json".to_string()),
                Just("full".to_string()),
                Just("compact".to_string()),
            ],
        )
            .prop_map(|(level, colored, file_enabled, format)| LoggerSettings {
                level,
                console: ConsoleSettings {
                    enabled: true,
                    colored,
                },
                file: FileSettings {
                    enabled: file_enabled,
                    path: default_log_path(),
                    append: true,
                    format,
                },
            })
    }

    fn arb_settings() -> impl Strategy<Value = Settings> {
        (
            1usize..=500usize,
            arb_apn_config(),
            arb_multicast_config(),
            arb_multicast_config(),
            arb_logger_settings(),
        )
            .prop_map(|(concurrency, apn, fcm, gcm, logger)| Settings {
                application: ApplicationConfig::default(),
                dispatch: DispatchConfig { concurrency },
                apn,
                fcm,
                gcm,
                logger,
            })
    }

    // ========================================================================
    // Property-based tests
    // ========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Serializing settings to TOML and back yields the same settings
        #[test]
        fn prop_settings_round_trip_serialization(settings in arb_settings()) {
            let toml_str = toml::to_string(&settings)
                .expect("Settings should serialize to TOML");

            let deserialized: Settings = toml::from_str(&toml_str)
                .expect("TOML should deserialize back to Settings");

            prop_assert_eq!(settings, deserialized);
        }

        /// The APN time-to-live stays between one hour and 30 days
        #[test]
        fn prop_apn_ttl_is_clamped(ttl in any::<u64>()) {
            let config = ApnConfig { time_to_live: ttl, ..ApnConfig::default() };
            let effective = config.effective_time_to_live();
            prop_assert!(effective >= Duration::from_secs(MIN_APN_TIME_TO_LIVE));
            prop_assert!(effective <= Duration::from_secs(MAX_APN_TIME_TO_LIVE));
        }
    }

    // ========================================================================
    // Unit tests
    // ========================================================================

    #[test]
    fn test_application_config_defaults() {
        let config = ApplicationConfig::default();
        assert_eq!(config.name, "push-dispatch");
        assert_eq!(config.version, crate::pkg_version());
    }

    #[test]
    fn test_dispatch_defaults() {
        assert_eq!(DispatchConfig::default().concurrency, 30);
    }

    #[test]
    fn test_apn_defaults() {
        let config = ApnConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.concurrency, 50);
        assert_eq!(config.sound, "default");
        assert_eq!(config.effective_time_to_live(), Duration::from_secs(172_800));
        assert_eq!(config.feedback_interval(), Duration::from_secs(300));

        let config = ApnConfig {
            time_to_live: u64::MAX,
            ..ApnConfig::default()
        };
        assert_eq!(
            config.effective_time_to_live(),
            Duration::from_secs(MAX_APN_TIME_TO_LIVE)
        );
    }

    #[test]
    fn test_multicast_ttl_defaults_per_backend() {
        let config = MulticastConfig::default();
        assert_eq!(config.time_to_live_for(Backend::Fcm), Duration::from_secs(1_209_600));
        assert_eq!(config.time_to_live_for(Backend::Gcm), Duration::from_secs(2_419_200));

        let config = MulticastConfig {
            time_to_live: Some(60),
            ..MulticastConfig::default()
        };
        assert_eq!(config.time_to_live_for(Backend::Gcm), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [fcm]
            enabled = true
            server_key = "abc"
            "#,
        )
        .unwrap();

        assert!(settings.fcm.enabled);
        assert_eq!(settings.fcm.app_name, "TinyPush");
        assert_eq!(settings.fcm.retry_count, 8);
        assert!(!settings.gcm.enabled);
        assert_eq!(settings.dispatch.concurrency, 30);
    }

    #[test]
    fn test_logger_settings_conversion() {
        let settings = LoggerSettings::default();
        let config = settings.into_logger_config().unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.file.format, LogFormat::Json);

        let bad = LoggerSettings {
            file: FileSettings {
                format: "xml".to_string(),
                ..FileSettings::default()
            },
            ..LoggerSettings::default()
        };
        assert!(bad.into_logger_config().is_err());
    }
}

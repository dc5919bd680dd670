//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::config::error::ConfigError;
use crate::config::settings::{
    ApnConfig, DispatchConfig, FileSettings, LoggerSettings, MulticastConfig, Settings,
};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl DispatchConfig {
    /// Validate dispatcher configuration
    ///
    /// # Validation Rules
    /// - Concurrency must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::validation(
                "dispatch.concurrency",
                "Dispatch concurrency must be greater than 0.",
            ));
        }

        Ok(())
    }
}

impl ApnConfig {
    /// Validate APN configuration
    ///
    /// # Validation Rules
    /// - Certificate and key paths are required when the adapter is enabled
    /// - Concurrency must be greater than 0
    /// - Feedback interval must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.cert_file.trim().is_empty() {
            return Err(ConfigError::validation(
                "apn.cert_file",
                "Certificate file is required when APN is enabled.",
            ));
        }

        if self.enabled && self.key_file.trim().is_empty() {
            return Err(ConfigError::validation(
                "apn.key_file",
                "Key file is required when APN is enabled.",
            ));
        }

        if self.concurrency == 0 {
            return Err(ConfigError::validation(
                "apn.concurrency",
                "APN concurrency must be greater than 0.",
            ));
        }

        if self.feedback_interval == 0 {
            return Err(ConfigError::validation(
                "apn.feedback_interval",
                "Feedback interval must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl MulticastConfig {
    /// Validate an FCM or GCM section
    ///
    /// `section` is the TOML table name used in error messages.
    ///
    /// # Validation Rules
    /// - Server key is required when the adapter is enabled
    /// - App name must not be empty
    /// - Concurrency must be greater than 0
    /// - An endpoint override must be an http(s) URL
    pub fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.enabled && self.server_key.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: format!("{section}.server_key"),
                message: format!(
                    "Server key is required when {} is enabled.",
                    section.to_uppercase()
                ),
            });
        }

        if self.app_name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: format!("{section}.app_name"),
                message: "App name must not be empty.".to_string(),
            });
        }

        if self.concurrency == 0 {
            return Err(ConfigError::ValidationError {
                field: format!("{section}.concurrency"),
                message: "Concurrency must be greater than 0.".to_string(),
            });
        }

        if let Some(endpoint) = &self.endpoint
            && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError {
                field: format!("{section}.endpoint"),
                message: format!("Invalid endpoint '{endpoint}'. Expected an http(s) URL."),
            });
        }

        Ok(())
    }
}

impl FileSettings {
    /// Validate file settings
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.file.validate()?;

        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// This method validates all sub-configurations and returns the first
    /// validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dispatch.validate()?;
        self.apn.validate()?;
        self.fcm.validate("fcm")?;
        self.gcm.validate("gcm")?;
        self.logger.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // DispatchConfig validation tests
    // ========================================================================

    #[test]
    fn test_dispatch_config_valid() {
        assert!(DispatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_dispatch_config_zero_concurrency() {
        let config = DispatchConfig { concurrency: 0 };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "dispatch.concurrency")
        );
    }

    // ========================================================================
    // ApnConfig validation tests
    // ========================================================================

    #[test]
    fn test_apn_disabled_without_credentials_ok() {
        assert!(ApnConfig::default().validate().is_ok());
    }

    #[test]
    fn test_apn_enabled_requires_cert() {
        let config = ApnConfig {
            enabled: true,
            key_file: "key.pem".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "apn.cert_file")
        );
    }

    #[test]
    fn test_apn_enabled_requires_key() {
        let config = ApnConfig {
            enabled: true,
            cert_file: "cert.pem".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "apn.key_file")
        );
    }

    #[test]
    fn test_apn_zero_feedback_interval() {
        let config = ApnConfig {
            feedback_interval: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "apn.feedback_interval")
        );
    }

    // ========================================================================
    // MulticastConfig validation tests
    // ========================================================================

    #[test]
    fn test_multicast_enabled_requires_key() {
        let config = MulticastConfig {
            enabled: true,
            ..Default::default()
        };
        let err = config.validate("gcm").unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "gcm.server_key")
        );
    }

    #[test]
    fn test_multicast_valid_with_key() {
        let config = MulticastConfig {
            enabled: true,
            server_key: "AAAA".to_string(),
            ..Default::default()
        };
        assert!(config.validate("fcm").is_ok());
    }

    #[test]
    fn test_multicast_invalid_endpoint() {
        let config = MulticastConfig {
            endpoint: Some("ftp://example.com".to_string()),
            ..Default::default()
        };
        let err = config.validate("fcm").unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "fcm.endpoint")
        );
    }

    #[test]
    fn test_multicast_zero_concurrency() {
        let config = MulticastConfig {
            concurrency: 0,
            ..Default::default()
        };
        let err = config.validate("fcm").unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "fcm.concurrency")
        );
    }

    // ========================================================================
    // LoggerSettings validation tests
    // ========================================================================

    #[test]
    fn test_logger_settings_valid_levels() {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "INFO", "Debug"];

        for level in valid_levels {
            let settings = LoggerSettings {
                level: level.to_string(),
                ..Default::default()
            };
            assert!(
                settings.validate().is_ok(),
                "Level should be valid: {}",
                level
            );
        }
    }

    #[test]
    fn test_logger_settings_invalid_level() {
        let settings = LoggerSettings {
            level: "invalid".to_string(),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "logger.level")
        );
    }

    #[test]
    fn test_logger_settings_file_enabled_empty_path() {
        let settings = LoggerSettings {
            file: FileSettings {
                enabled: true,
                path: "".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "logger.file.path")
        );
    }

    #[test]
    fn test_logger_settings_invalid_format() {
        let settings = LoggerSettings {
            file: FileSettings {
                format: "invalid".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "logger.file.format")
        );
    }

    // ========================================================================
    // Settings validation tests
    // ========================================================================

    #[test]
    fn test_settings_default_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_settings_reports_first_invalid_section() {
        let settings = Settings {
            fcm: MulticastConfig {
                enabled: true,
                ..Default::default()
            },
            logger: LoggerSettings {
                level: "invalid".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "fcm.server_key")
        );
    }
}

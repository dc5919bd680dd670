//! Layered configuration for the push adapters and the dispatcher
//!
//! # Configuration Priority (lowest to highest)
//! 1. `default.toml` - Base default configuration
//! 2. `{environment}.toml` - Environment-specific configuration
//! 3. `local.toml` - Local overrides (not committed to version control)
//! 4. `PUSH_*` environment variables

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{
    ApnConfig, ApplicationConfig, DispatchConfig, LoggerSettings, MAX_APN_TIME_TO_LIVE,
    MIN_APN_TIME_TO_LIVE, MULTICAST_BATCH_LIMIT,
    MulticastConfig, Settings,
};

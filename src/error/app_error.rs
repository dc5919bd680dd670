use crate::config::error::ConfigError;
use crate::models::Backend;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate-wide error type for push delivery.
///
/// Variants follow the failure taxonomy of the dispatch engine: configuration
/// problems are fatal at startup, validation problems are the caller's fault and
/// surface before any network I/O, transport problems are retryable, and fatal
/// provider errors require operator intervention.
#[derive(Error, Debug)]
pub enum PushError {
    /// Bad or missing initialization parameters
    #[error("Configuration error for {key}: {reason}")]
    Configuration { key: String, reason: String },

    /// Input rejected before any provider call (oversized batch, payload, bad token)
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Network or provider-side failure of a physical call
    #[error("Transport failure on {backend}")]
    Transport {
        backend: Backend,
        #[source]
        source: anyhow::Error,
    },

    /// Credentials rejected for every recipient of an adapter
    #[error("Fatal provider error on {backend}: {reason}")]
    FatalProvider { backend: Backend, reason: String },

    /// Internal invariant violated (e.g. provider result count mismatch)
    #[error("Invariant violated: {message}")]
    Invariant { message: String },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl PushError {
    pub fn configuration(key: impl Into<String>, reason: impl Into<String>) -> Self {
        PushError::Configuration {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PushError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn transport(backend: Backend, source: impl Into<anyhow::Error>) -> Self {
        PushError::Transport {
            backend,
            source: source.into(),
        }
    }

    /// Whether the caller may retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, PushError::Transport { .. })
    }

    /// Outcome classification used when this error is folded into per-recipient results
    pub fn outcome_kind(&self) -> ErrorKind {
        match self {
            PushError::Validation { .. } => ErrorKind::InvalidInput,
            PushError::FatalProvider { .. } | PushError::Configuration { .. } => {
                ErrorKind::ProviderMisconfigured
            }
            PushError::Transport { .. } | PushError::Invariant { .. } | PushError::Internal { .. } => {
                ErrorKind::TransportFailure
            }
        }
    }
}

impl From<anyhow::Error> for PushError {
    fn from(error: anyhow::Error) -> Self {
        PushError::Internal { source: error }
    }
}

impl From<ConfigError> for PushError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::ValidationError { field, message } => PushError::Configuration {
                key: field,
                reason: message,
            },
            other => PushError::Configuration {
                key: "settings".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Per-recipient failure classification carried by a `DeliveryOutcome`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Device registration is permanently dead; drives removal
    InvalidToken,
    /// Provider refused this recipient for a non-token reason
    DeliveryRejected,
    /// Network or backend failure; retryable by the caller
    TransportFailure,
    /// No enabled adapter serves the recipient's platform
    UnsupportedPlatform,
    /// Empty token, oversized payload or similar caller error
    InvalidInput,
    /// Adapter credentials were rejected; the recipient was not (or could not be) served
    ProviderMisconfigured,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::TransportFailure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::DeliveryRejected => "delivery_rejected",
            ErrorKind::TransportFailure => "transport_failure",
            ErrorKind::UnsupportedPlatform => "unsupported_platform",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::ProviderMisconfigured => "provider_misconfigured",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type alias for Result with PushError to simplify function signatures
pub type PushResult<T> = Result<T, PushError>;

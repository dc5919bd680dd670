use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Maximum serialized size of a single APN notification
pub const MAX_PAYLOAD_BYTES: usize = 4096;

/// Per-device APN notification
///
/// Serializes to the provider payload: the `aps` dictionary plus custom keys
/// at the top level. Expiry and priority travel as request metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnNotification {
    pub aps: Aps,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    /// Unix timestamp (seconds) after which the provider discards the notification
    #[serde(skip)]
    pub expiry: i64,
    /// 10 delivers immediately, 5 lets the device save power
    #[serde(skip)]
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aps {
    pub alert: String,
    pub badge: u32,
    pub sound: String,
}

impl ApnNotification {
    /// Size of the JSON payload sent to the provider
    pub fn encoded_len(&self) -> Result<usize, serde_json::Error> {
        serde_json::to_vec(self).map(|bytes| bytes.len())
    }
}

/// Class of a failed unary send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryFailureKind {
    /// The device token is dead and should be purged
    InvalidToken,
    /// Anything else; the caller may retry
    Other,
}

/// Inline failure report of a single APN send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryFailure {
    pub kind: UnaryFailureKind,
    pub reason: String,
}

impl UnaryFailure {
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self {
            kind: UnaryFailureKind::InvalidToken,
            reason: reason.into(),
        }
    }

    pub fn other(reason: impl Into<String>) -> Self {
        Self {
            kind: UnaryFailureKind::Other,
            reason: reason.into(),
        }
    }

    /// Classifies a status code of the binary provider protocol
    pub fn from_status_code(code: u8) -> Self {
        let reason = match code {
            1 => "Processing error",
            2 => "Missing device token",
            3 => "Missing topic",
            4 => "Missing payload",
            5 => "Invalid token size",
            6 => "Invalid topic size",
            7 => "Invalid payload size",
            8 => "Invalid token",
            10 => "Shutdown",
            _ => "Unknown error",
        };
        if code == 8 {
            Self::invalid_token(reason)
        } else {
            Self::other(reason)
        }
    }

    /// Classifies a rejection reason of the HTTP/2 provider API
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "BadDeviceToken" | "Unregistered" | "DeviceTokenNotForTopic" => {
                Self::invalid_token(reason)
            }
            other => Self::other(other),
        }
    }

    pub fn is_invalid_token(&self) -> bool {
        self.kind == UnaryFailureKind::InvalidToken
    }
}

impl fmt::Display for UnaryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for UnaryFailure {}

/// Device reported stale by the feedback channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleDevice {
    /// Raw device token bytes
    pub token: Vec<u8>,
    /// Unix timestamp (seconds) at which the provider noticed the app was gone
    pub timestamp: i64,
}

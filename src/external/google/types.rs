use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Legacy FCM/GCM HTTP downstream message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MulticastMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub registration_ids: Vec<String>,
    pub collapse_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_available: Option<bool>,
    pub delay_while_idle: bool,
    pub time_to_live: u64,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<AndroidAlert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl MulticastMessage {
    /// Number of devices addressed by this single call
    pub fn recipient_count(&self) -> usize {
        if self.to.is_some() {
            1
        } else {
            self.registration_ids.len()
        }
    }
}

/// Visible notification block of a Google message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidAlert {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub sound: String,
}

/// Response of a legacy multicast call
///
/// `results[i]` corresponds to the i-th addressed token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MulticastResponse {
    #[serde(default)]
    pub multicast_id: i64,
    #[serde(default)]
    pub success: usize,
    #[serde(default)]
    pub failure: usize,
    #[serde(default)]
    pub canonical_ids: usize,
    #[serde(default)]
    pub results: Vec<MulticastResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticastResult {
    #[serde(default)]
    pub message_id: Option<String>,
    /// Canonical registration replacing the addressed token
    #[serde(default)]
    pub registration_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MulticastResult {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            ..Default::default()
        }
    }

    pub fn canonical(message_id: impl Into<String>, registration_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            registration_id: Some(registration_id.into()),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>) -> Self {
        Self {
            error: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn error_code(&self) -> Option<ProviderErrorCode> {
        self.error.as_deref().map(ProviderErrorCode::parse)
    }
}

/// Error codes reported per result by the legacy Google endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorCode {
    InvalidRegistration,
    NotRegistered,
    MismatchSenderId,
    MissingRegistration,
    MessageTooBig,
    InvalidTtl,
    Unavailable,
    InternalServerError,
    DeviceMessageRateExceeded,
    Other(String),
}

impl ProviderErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "InvalidRegistration" => ProviderErrorCode::InvalidRegistration,
            "NotRegistered" => ProviderErrorCode::NotRegistered,
            "MismatchSenderId" => ProviderErrorCode::MismatchSenderId,
            "MissingRegistration" => ProviderErrorCode::MissingRegistration,
            "MessageTooBig" => ProviderErrorCode::MessageTooBig,
            "InvalidTtl" => ProviderErrorCode::InvalidTtl,
            "Unavailable" => ProviderErrorCode::Unavailable,
            "InternalServerError" => ProviderErrorCode::InternalServerError,
            "DeviceMessageRateExceeded" => ProviderErrorCode::DeviceMessageRateExceeded,
            other => ProviderErrorCode::Other(other.to_string()),
        }
    }

    /// The registration is permanently dead
    pub fn is_invalid_token(&self) -> bool {
        matches!(
            self,
            ProviderErrorCode::InvalidRegistration | ProviderErrorCode::NotRegistered
        )
    }
}

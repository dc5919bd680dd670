//! Provider transport seams.
//!
//! Transports are pre-authenticated connection handles owned by the host
//! process. Adapters only build provider-shaped requests, hand them to a
//! transport, and receive provider-shaped responses back.

use async_trait::async_trait;

use super::apple::{ApnNotification, StaleDevice, UnaryFailure};
use super::google::{MulticastMessage, MulticastResponse};
use crate::error::PushResult;
use crate::models::PushToken;

/// Transport for backends with native batch delivery
#[async_trait]
pub trait MulticastTransport: Send + Sync {
    /// Performs one physical call carrying every token of `message`
    ///
    /// Fails only when the call as a whole did not complete; per-token
    /// rejections are reported inside the response.
    async fn send(&self, message: &MulticastMessage) -> PushResult<MulticastResponse>;
}

/// Transport for backends that take exactly one device per request
#[async_trait]
pub trait UnaryTransport: Send + Sync {
    async fn send(&self, token: &PushToken, notification: &ApnNotification) -> Result<(), UnaryFailure>;
}

/// Out-of-band channel reporting devices that no longer accept notifications
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    async fn fetch_stale_devices(&self) -> PushResult<Vec<StaleDevice>>;
}

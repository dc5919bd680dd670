//! Apple Push Notification service adapter.
//!
//! APN has no native multicast: every device gets its own notification so
//! that badges can differ per recipient.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::provider::{DeliveryShape, PushAdapter, RawResponse, check_call_size};
use crate::config::{ApnConfig, MAX_APN_TIME_TO_LIVE, MIN_APN_TIME_TO_LIVE};
use crate::error::{PushError, PushResult};
use crate::external::UnaryTransport;
use crate::external::apple::{ApnNotification, Aps, MAX_PAYLOAD_BYTES};
use crate::models::{Backend, Notification, Priority, Target};

const PRIORITY_IMMEDIATE: u8 = 10;
const PRIORITY_POWER_SAVING: u8 = 5;
const MIN_TIME_TO_LIVE: Duration = Duration::from_secs(MIN_APN_TIME_TO_LIVE);
const MAX_TIME_TO_LIVE: Duration = Duration::from_secs(MAX_APN_TIME_TO_LIVE);

/// APN adapter (unary shape)
pub struct ApnProvider {
    config: ApnConfig,
    transport: Arc<dyn UnaryTransport>,
}

impl ApnProvider {
    /// Checks the credential files and binds the transport
    ///
    /// # Errors
    /// `Configuration` when a certificate or key path is missing or does not exist
    pub fn initialize(config: ApnConfig, transport: Arc<dyn UnaryTransport>) -> PushResult<Self> {
        check_credential_file("apn.cert_file", "certificate", &config.cert_file)?;
        check_credential_file("apn.key_file", "key", &config.key_file)?;

        if config.concurrency == 0 {
            return Err(PushError::configuration(
                "apn.concurrency",
                "Concurrency must be greater than 0",
            ));
        }

        if config.production {
            tracing::info!("APN adapter initialized");
        } else {
            tracing::info!("APN adapter initialized in sandbox mode");
        }

        Ok(Self { config, transport })
    }

    /// Builds the notification for one device
    ///
    /// The time-to-live is clamped between one hour and 30 days.
    ///
    /// # Errors
    /// `Validation` when the expiry cannot be represented or the serialized
    /// payload exceeds the provider limit
    pub fn build_notification(
        &self,
        target: &Target,
        notification: &Notification,
    ) -> PushResult<ApnNotification> {
        let ttl = notification
            .time_to_live
            .map(|ttl| ttl.clamp(MIN_TIME_TO_LIVE, MAX_TIME_TO_LIVE))
            .unwrap_or_else(|| self.config.effective_time_to_live());
        let expiry = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| jiff::Timestamp::now().as_second().checked_add(secs))
            .ok_or_else(|| {
                PushError::validation("time_to_live", "Expiry is out of the representable range")
            })?;

        let priority = match notification.priority {
            Some(Priority::Normal) => PRIORITY_POWER_SAVING,
            _ => PRIORITY_IMMEDIATE,
        };

        let apn = ApnNotification {
            aps: Aps {
                alert: notification.body.clone(),
                badge: notification.badge.unwrap_or(target.unread),
                sound: notification
                    .sound
                    .clone()
                    .unwrap_or_else(|| self.config.sound.clone()),
            },
            payload: notification.payload.clone(),
            expiry,
            priority,
        };

        let size = apn
            .encoded_len()
            .map_err(|e| PushError::validation("payload", e.to_string()))?;
        if size > MAX_PAYLOAD_BYTES {
            return Err(PushError::validation(
                "payload",
                format!("The total payload size ({size} bytes) exceeds the allowed {MAX_PAYLOAD_BYTES} bytes"),
            ));
        }

        Ok(apn)
    }
}

fn check_credential_file(key: &str, label: &str, path: &str) -> PushResult<()> {
    if path.trim().is_empty() {
        return Err(PushError::configuration(
            key,
            format!("An APN {label} file is needed"),
        ));
    }

    if !Path::new(path).exists() {
        return Err(PushError::configuration(
            key,
            format!("The provided APN {label} file does not exist: {path}"),
        ));
    }

    Ok(())
}

#[async_trait]
impl PushAdapter for ApnProvider {
    fn backend(&self) -> Backend {
        Backend::Apn
    }

    fn shape(&self) -> DeliveryShape {
        DeliveryShape::Unary
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    fn validate(&self, target: &Target, notification: &Notification) -> PushResult<()> {
        self.build_notification(target, notification).map(|_| ())
    }

    async fn deliver(
        &self,
        targets: &[Target],
        notification: &Notification,
    ) -> PushResult<RawResponse> {
        check_call_size(Backend::Apn, self.shape(), targets)?;
        let target = &targets[0];

        let apn = self.build_notification(target, notification)?;
        let result = self.transport.send(&target.token, &apn).await;

        if let Err(failure) = &result {
            tracing::debug!(token = %target.token, reason = %failure, "APN send failed");
        }

        Ok(RawResponse::Unary(result))
    }
}

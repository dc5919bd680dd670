//! Firebase Cloud Messaging adapter.

use std::sync::Arc;

use async_trait::async_trait;

use super::provider::{DeliveryShape, PushAdapter, RawResponse, check_call_size};
use crate::config::{MULTICAST_BATCH_LIMIT, MulticastConfig};
use crate::error::{PushError, PushResult};
use crate::external::MulticastTransport;
use crate::external::google::{AndroidAlert, MulticastMessage};
use crate::models::{Backend, Notification, Priority, Target};

pub(crate) const ANDROID_ICON: &str = "ic_launcher";

/// FCM adapter (multicast shape)
///
/// # Example
/// ```ignore
/// let provider = FcmProvider::initialize(settings.fcm, Arc::new(client))?;
/// let raw = provider.deliver(&targets, &notification).await?;
/// ```
pub struct FcmProvider {
    config: MulticastConfig,
    transport: Arc<dyn MulticastTransport>,
}

impl FcmProvider {
    /// Validates the configuration and binds the transport
    ///
    /// # Errors
    /// `Configuration` when the server key is empty or the concurrency is zero
    pub fn initialize(
        config: MulticastConfig,
        transport: Arc<dyn MulticastTransport>,
    ) -> PushResult<Self> {
        validate_multicast_config(Backend::Fcm, &config)?;

        tracing::info!(
            app_name = %config.app_name,
            simulate = config.simulate,
            "FCM adapter initialized"
        );

        Ok(Self { config, transport })
    }

    /// Builds the downstream message for one call
    pub fn build_message(&self, targets: &[Target], notification: &Notification) -> MulticastMessage {
        let mut tokens: Vec<String> = targets.iter().map(|t| t.token.to_string()).collect();
        let (to, registration_ids) = if tokens.len() == 1 {
            (tokens.pop(), Vec::new())
        } else {
            (None, tokens)
        };

        let alert = (!notification.body.is_empty()).then(|| AndroidAlert {
            title: notification
                .title
                .clone()
                .unwrap_or_else(|| self.config.app_name.clone()),
            body: notification.body.clone(),
            icon: ANDROID_ICON.to_string(),
            sound: notification
                .sound
                .clone()
                .unwrap_or_else(|| self.config.sound.clone()),
        });

        let priority = match notification.priority {
            Some(Priority::High) => "high",
            _ => "normal",
        };

        MulticastMessage {
            to,
            registration_ids,
            collapse_key: notification.collapse_key().to_string(),
            priority: Some(priority.to_string()),
            content_available: Some(true),
            delay_while_idle: self.config.delay_while_idle,
            time_to_live: notification
                .time_to_live
                .unwrap_or_else(|| self.config.time_to_live_for(Backend::Fcm))
                .as_secs(),
            dry_run: self.config.simulate,
            notification: alert,
            data: (!notification.payload.is_empty()).then(|| notification.payload.clone()),
        }
    }
}

pub(crate) fn validate_multicast_config(backend: Backend, config: &MulticastConfig) -> PushResult<()> {
    if config.server_key.trim().is_empty() {
        return Err(PushError::configuration(
            format!("{backend}.server_key"),
            format!("The provided {} key is empty", backend.as_str().to_uppercase()),
        ));
    }

    if config.concurrency == 0 {
        return Err(PushError::configuration(
            format!("{backend}.concurrency"),
            "Concurrency must be greater than 0",
        ));
    }

    Ok(())
}

#[async_trait]
impl PushAdapter for FcmProvider {
    fn backend(&self) -> Backend {
        Backend::Fcm
    }

    fn shape(&self) -> DeliveryShape {
        DeliveryShape::Multicast {
            max_batch: MULTICAST_BATCH_LIMIT,
        }
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency
    }

    async fn deliver(
        &self,
        targets: &[Target],
        notification: &Notification,
    ) -> PushResult<RawResponse> {
        check_call_size(Backend::Fcm, self.shape(), targets)?;

        let message = self.build_message(targets, notification);
        let response = self.transport.send(&message).await?;

        tracing::debug!(
            tokens = targets.len(),
            success = response.success,
            failure = response.failure,
            "FCM call completed"
        );

        Ok(RawResponse::Multicast(response))
    }
}

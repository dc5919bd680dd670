//! Legacy Google Cloud Messaging adapter.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::fcm_provider::{ANDROID_ICON, validate_multicast_config};
use super::provider::{DeliveryShape, PushAdapter, RawResponse, check_call_size};
use crate::config::{MULTICAST_BATCH_LIMIT, MulticastConfig};
use crate::error::PushResult;
use crate::external::MulticastTransport;
use crate::external::google::{AndroidAlert, MulticastMessage};
use crate::models::{Backend, Notification, Target};

/// GCM adapter (multicast shape)
pub struct GcmProvider {
    config: MulticastConfig,
    transport: Arc<dyn MulticastTransport>,
}

impl GcmProvider {
    pub fn initialize(
        config: MulticastConfig,
        transport: Arc<dyn MulticastTransport>,
    ) -> PushResult<Self> {
        validate_multicast_config(Backend::Gcm, &config)?;

        tracing::info!(
            app_name = %config.app_name,
            simulate = config.simulate,
            "GCM adapter initialized"
        );

        Ok(Self { config, transport })
    }

    /// Builds the downstream message for one call
    ///
    /// The data block is a per-call copy of the notification payload
    /// completed with the keys older Android clients read.
    pub fn build_message(&self, targets: &[Target], notification: &Notification) -> MulticastMessage {
        MulticastMessage {
            to: None,
            registration_ids: targets.iter().map(|t| t.token.to_string()).collect(),
            collapse_key: notification.collapse_key().to_string(),
            priority: None,
            content_available: None,
            delay_while_idle: self.config.delay_while_idle,
            time_to_live: notification
                .time_to_live
                .unwrap_or_else(|| self.config.time_to_live_for(Backend::Gcm))
                .as_secs(),
            dry_run: self.config.simulate,
            notification: Some(AndroidAlert {
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
            }),
            data: Some(legacy_data(notification)),
        }
    }
}

fn legacy_data(notification: &Notification) -> Map<String, Value> {
    let mut data = notification.payload.clone();
    data.entry("msgcnt").or_insert_with(|| Value::from("0"));
    data.entry("message")
        .or_insert_with(|| Value::from(notification.body.as_str()));
    data.entry("content-available")
        .or_insert_with(|| Value::from("1"));
    data
}

#[async_trait]
impl PushAdapter for GcmProvider {
    fn backend(&self) -> Backend {
        Backend::Gcm
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
        check_call_size(Backend::Gcm, self.shape(), targets)?;

        let message = self.build_message(targets, notification);
        let response = self.transport.send(&message).await?;

        tracing::debug!(
            tokens = targets.len(),
            success = response.success,
            failure = response.failure,
            "GCM call completed"
        );

        Ok(RawResponse::Multicast(response))
    }
}

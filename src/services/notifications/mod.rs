//! Push delivery across APN, FCM and GCM.
//!
//! Adapters translate a canonical notification into each provider's request
//! shape, the normalizer turns raw answers into per-recipient outcomes, and
//! the dispatcher fans a batch out under one concurrency bound. Token
//! lifecycle deltas flow to subscribers through the feedback bus.

mod apn_provider;
mod dispatcher;
mod fcm_provider;
mod feedback;
mod feedback_poller;
mod gcm_provider;
mod normalizer;
mod provider;

pub mod notification_service;

#[cfg(test)]
pub(crate) mod testing;

pub use apn_provider::ApnProvider;
pub use dispatcher::BatchDispatcher;
pub use fcm_provider::FcmProvider;
pub use feedback::{FeedbackBus, FeedbackHandler};
pub use feedback_poller::{FeedbackPoller, poll_once};
pub use gcm_provider::GcmProvider;
pub use normalizer::{Normalized, normalize, normalize_multicast, normalize_stale_devices, normalize_unary};
pub use notification_service::{BackendSender, PushService, SendRequest};
pub use provider::{DeliveryShape, PushAdapter, RawResponse};

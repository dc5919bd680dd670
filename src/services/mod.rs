//! Service layer for push delivery.
//!
//! Services coordinate the provider adapters, the result normalizer and the
//! feedback bus behind the `PushService` facade.

pub mod notifications;

pub use notifications::{BackendSender, BatchDispatcher, FeedbackBus, PushService, SendRequest};

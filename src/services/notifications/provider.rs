//! Core push adapter trait and types.
//!
//! An adapter turns a canonical [`Notification`] into the provider's request
//! shape for one backend and hands it to a pre-authenticated transport. The
//! raw provider answer is returned untouched; turning it into per-recipient
//! outcomes is the normalizer's job.

use async_trait::async_trait;

use crate::error::{PushError, PushResult};
use crate::external::apple::UnaryFailure;
use crate::external::google::MulticastResponse;
use crate::models::{Backend, Notification, Target};

/// How a backend accepts recipients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryShape {
    /// One physical call carries up to `max_batch` tokens
    Multicast { max_batch: usize },
    /// One physical call per token
    Unary,
}

/// Provider answer for one physical call
#[derive(Debug, Clone)]
pub enum RawResponse {
    /// Positionally aligned results of a multicast call
    Multicast(MulticastResponse),
    /// Inline report of a single-device call
    Unary(Result<(), UnaryFailure>),
}

/// Trait implemented by every backend adapter
///
/// Uses `async_trait` to support async methods with dynamic dispatch.
/// Adapters are shared across concurrent sends and must be Send + Sync.
#[async_trait]
pub trait PushAdapter: Send + Sync {
    fn backend(&self) -> Backend;

    fn shape(&self) -> DeliveryShape;

    /// Concurrency limit for direct sends through this adapter
    fn concurrency(&self) -> usize;

    /// Per-recipient checks run before any network call
    fn validate(&self, _target: &Target, _notification: &Notification) -> PushResult<()> {
        Ok(())
    }

    /// Performs one physical provider call
    ///
    /// Multicast adapters accept up to their `max_batch`; unary adapters accept
    /// exactly one target.
    async fn deliver(
        &self,
        targets: &[Target],
        notification: &Notification,
    ) -> PushResult<RawResponse>;
}

/// Rejects a physical call that does not fit `shape`
pub(crate) fn check_call_size(
    backend: Backend,
    shape: DeliveryShape,
    targets: &[Target],
) -> PushResult<()> {
    let limit = match shape {
        DeliveryShape::Multicast { max_batch } => max_batch,
        DeliveryShape::Unary => 1,
    };

    if targets.is_empty() || targets.len() > limit {
        return Err(PushError::validation(
            "tokens",
            format!(
                "{backend} accepts between 1 and {limit} tokens per call, got {}",
                targets.len()
            ),
        ));
    }

    Ok(())
}

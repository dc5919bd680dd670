//! Batch dispatch across backend adapters.
//!
//! A batch is resolved recipient by recipient, grouped per adapter, cut into
//! physical calls (chunks for multicast backends, single devices for unary
//! ones) and executed under one shared limiter. Outcomes are written back into
//! the slot of the recipient they belong to, so completion order never matters.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::feedback::FeedbackBus;
use super::normalizer::normalize;
use super::provider::{DeliveryShape, PushAdapter};
use crate::error::{ErrorKind, PushError};
use crate::models::{
    Backend, BatchReport, DeliveryOutcome, Notification, PushToken, Recipient, RouteTag, Target,
};

/// Routes heterogeneous recipients to the enabled adapters
#[derive(Clone)]
pub struct BatchDispatcher {
    adapters: BTreeMap<Backend, Arc<dyn PushAdapter>>,
    bus: FeedbackBus,
    concurrency: usize,
}

impl BatchDispatcher {
    /// Creates a dispatcher with no adapter enabled
    ///
    /// `concurrency` bounds the physical calls in flight for one `batch`.
    pub fn new(bus: FeedbackBus, concurrency: usize) -> Self {
        Self {
            adapters: BTreeMap::new(),
            bus,
            concurrency: concurrency.max(1),
        }
    }

    /// Enables `adapter` for routing
    pub fn with_adapter(mut self, adapter: Arc<dyn PushAdapter>) -> Self {
        self.adapters.insert(adapter.backend(), adapter);
        self
    }

    pub fn is_enabled(&self, backend: Backend) -> bool {
        self.adapters.contains_key(&backend)
    }

    /// First enabled adapter among the route's candidates
    pub fn resolve(&self, route: RouteTag) -> Option<&Arc<dyn PushAdapter>> {
        route
            .candidates()
            .iter()
            .find_map(|backend| self.adapters.get(backend))
    }

    /// Sends `notification` to every recipient
    ///
    /// Never fails as a whole: `outcomes[i]` always describes `recipients[i]`,
    /// and fatal provider errors are reported next to the outcomes.
    pub async fn batch(&self, recipients: &[Recipient], notification: &Notification) -> BatchReport {
        if recipients.is_empty() {
            return BatchReport::default();
        }

        let span = tracing::info_span!(
            "push_batch",
            batch_id = %Uuid::new_v4(),
            recipients = recipients.len()
        );
        self.run_batch(recipients, notification).instrument(span).await
    }

    async fn run_batch(&self, recipients: &[Recipient], notification: &Notification) -> BatchReport {
        let mut slots: Vec<Option<DeliveryOutcome>> = vec![None; recipients.len()];
        let mut groups: BTreeMap<Backend, (Arc<dyn PushAdapter>, Vec<(usize, Target)>)> =
            BTreeMap::new();

        for (index, recipient) in recipients.iter().enumerate() {
            let target = Target::from(recipient);
            if target.token.is_blank() {
                slots[index] = Some(DeliveryOutcome::failed(target.token, ErrorKind::InvalidInput));
                continue;
            }

            let Some(adapter) = recipient.route().and_then(|route| self.resolve(route)) else {
                tracing::debug!(platform = %recipient.platform, "No enabled adapter for platform");
                slots[index] = Some(DeliveryOutcome::failed(
                    target.token,
                    ErrorKind::UnsupportedPlatform,
                ));
                continue;
            };

            if let Err(e) = adapter.validate(&target, notification) {
                tracing::debug!(token = %target.token, error = %e, "Recipient rejected before sending");
                slots[index] = Some(DeliveryOutcome::failed(target.token, e.outcome_kind()));
                continue;
            }

            groups
                .entry(adapter.backend())
                .or_insert_with(|| (Arc::clone(adapter), Vec::new()))
                .1
                .push((index, target));
        }

        let calls: Vec<Call> = groups
            .into_values()
            .flat_map(|(adapter, entries)| plan_calls(&adapter, entries))
            .collect();
        tracing::debug!(calls = calls.len(), "Dispatching provider calls");

        let fatal_errors = execute(calls, notification, self.concurrency, &self.bus, &mut slots).await;
        let report = assemble(slots, recipients.iter().map(|r| &r.token), fatal_errors);

        tracing::info!(
            successful = report.summary.successful,
            failed = report.summary.failed,
            fatal = report.fatal_errors.len(),
            "Batch dispatched"
        );
        report
    }
}

/// Sends to already validated targets of a single adapter
pub(crate) async fn dispatch_targets(
    adapter: &Arc<dyn PushAdapter>,
    targets: Vec<Target>,
    notification: &Notification,
    concurrency: usize,
    bus: &FeedbackBus,
) -> BatchReport {
    let mut slots: Vec<Option<DeliveryOutcome>> = vec![None; targets.len()];
    let tokens: Vec<_> = targets.iter().map(|t| t.token.clone()).collect();

    let calls = plan_calls(adapter, targets.into_iter().enumerate().collect());
    let fatal_errors = execute(calls, notification, concurrency, bus, &mut slots).await;

    assemble(slots, tokens.iter(), fatal_errors)
}

/// One physical provider call and the recipient slots it answers for
struct Call {
    adapter: Arc<dyn PushAdapter>,
    slots: Vec<usize>,
    targets: Vec<Target>,
    /// Shared by every call to the same adapter; cancelled on a fatal error
    abort: CancellationToken,
}

enum CallResult {
    Delivered(Vec<DeliveryOutcome>),
    Failed(ErrorKind),
    Fatal(PushError),
    Skipped,
}

fn plan_calls(adapter: &Arc<dyn PushAdapter>, entries: Vec<(usize, Target)>) -> Vec<Call> {
    let size = match adapter.shape() {
        DeliveryShape::Multicast { max_batch } => max_batch.max(1),
        DeliveryShape::Unary => 1,
    };
    let abort = CancellationToken::new();

    entries
        .chunks(size)
        .map(|chunk| {
            let (slots, targets): (Vec<usize>, Vec<Target>) = chunk.iter().cloned().unzip();
            Call {
                adapter: Arc::clone(adapter),
                slots,
                targets,
                abort: abort.clone(),
            }
        })
        .collect()
}

/// Runs every call under one limiter and fills the answered slots
///
/// Returns the fatal provider errors raised, at most one per adapter.
async fn execute(
    calls: Vec<Call>,
    notification: &Notification,
    concurrency: usize,
    bus: &FeedbackBus,
    slots: &mut [Option<DeliveryOutcome>],
) -> Vec<PushError> {
    let limiter = Semaphore::new(concurrency.max(1));
    let results = join_all(
        calls
            .iter()
            .map(|call| run_call(call, notification, &limiter, bus)),
    )
    .await;

    let mut fatal_errors: Vec<PushError> = Vec::new();
    for (call, result) in calls.iter().zip(results) {
        let kind = match result {
            CallResult::Delivered(outcomes) => {
                for (slot, outcome) in call.slots.iter().zip(outcomes) {
                    slots[*slot] = Some(outcome);
                }
                continue;
            }
            CallResult::Failed(kind) => kind,
            CallResult::Fatal(e) => {
                let backend = call.adapter.backend();
                let reported = fatal_errors.iter().any(
                    |f| matches!(f, PushError::FatalProvider { backend: b, .. } if *b == backend),
                );
                if !reported {
                    fatal_errors.push(e);
                }
                ErrorKind::ProviderMisconfigured
            }
            CallResult::Skipped => ErrorKind::ProviderMisconfigured,
        };

        for (slot, target) in call.slots.iter().zip(&call.targets) {
            slots[*slot] = Some(DeliveryOutcome::failed(target.token.clone(), kind));
        }
    }

    fatal_errors
}

async fn run_call(
    call: &Call,
    notification: &Notification,
    limiter: &Semaphore,
    bus: &FeedbackBus,
) -> CallResult {
    let Ok(_permit) = limiter.acquire().await else {
        return CallResult::Failed(ErrorKind::TransportFailure);
    };

    if call.abort.is_cancelled() {
        return CallResult::Skipped;
    }

    let backend = call.adapter.backend();
    let result = call
        .adapter
        .deliver(&call.targets, notification)
        .await
        .and_then(|raw| normalize(backend, &call.targets, raw));

    match result {
        Ok(normalized) => {
            bus.publish(&normalized.feedback);
            CallResult::Delivered(normalized.outcomes)
        }
        Err(e @ PushError::FatalProvider { .. }) => {
            call.abort.cancel();
            tracing::error!(%backend, error = %e, "Provider rejected the credentials, skipping remaining calls");
            CallResult::Fatal(e)
        }
        Err(e) => {
            tracing::warn!(%backend, tokens = call.targets.len(), error = %e, "Provider call failed");
            CallResult::Failed(e.outcome_kind())
        }
    }
}

fn assemble<'a>(
    slots: Vec<Option<DeliveryOutcome>>,
    tokens: impl Iterator<Item = &'a PushToken>,
    fatal_errors: Vec<PushError>,
) -> BatchReport {
    let outcomes = slots
        .into_iter()
        .zip(tokens)
        .map(|(slot, token)| {
            slot.unwrap_or_else(|| DeliveryOutcome::failed(token.clone(), ErrorKind::TransportFailure))
        })
        .collect();

    BatchReport::new(outcomes, fatal_errors)
}

//! Stub transports for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::PushResult;
use crate::external::apple::{ApnNotification, StaleDevice, UnaryFailure};
use crate::external::google::{MulticastMessage, MulticastResponse, MulticastResult};
use crate::external::{FeedbackSource, MulticastTransport, UnaryTransport};
use crate::models::PushToken;

/// Tracks concurrent calls and the highest concurrency observed
#[derive(Default)]
pub(crate) struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
    calls: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

type Responder = Box<dyn Fn(&MulticastMessage) -> PushResult<MulticastResponse> + Send + Sync>;

pub(crate) fn message_tokens(message: &MulticastMessage) -> Vec<String> {
    match &message.to {
        Some(to) => vec![to.clone()],
        None => message.registration_ids.clone(),
    }
}

/// Multicast transport answering from a closure
pub(crate) struct StubMulticast {
    respond: Responder,
    delay: Duration,
    messages: Mutex<Vec<MulticastMessage>>,
    gauge: InFlight,
}

impl StubMulticast {
    pub fn responding<F>(respond: F) -> Self
    where
        F: Fn(&MulticastMessage) -> PushResult<MulticastResponse> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: Duration::ZERO,
            messages: Mutex::new(Vec::new()),
            gauge: InFlight::default(),
        }
    }

    /// Answers each token with the result chosen by `result_for`
    pub fn by_token<F>(result_for: F) -> Self
    where
        F: Fn(&str) -> MulticastResult + Send + Sync + 'static,
    {
        Self::responding(move |message| {
            let results: Vec<MulticastResult> =
                message_tokens(message).iter().map(|t| result_for(t)).collect();
            let failure = results.iter().filter(|r| r.error.is_some()).count();
            Ok(MulticastResponse {
                multicast_id: 1,
                success: results.len() - failure,
                failure,
                canonical_ids: results.iter().filter(|r| r.registration_id.is_some()).count(),
                results,
            })
        })
    }

    pub fn delivering() -> Self {
        Self::by_token(|_| MulticastResult::delivered("0:1"))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.gauge.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.gauge.max.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<MulticastMessage> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl MulticastTransport for StubMulticast {
    async fn send(&self, message: &MulticastMessage) -> PushResult<MulticastResponse> {
        self.gauge.enter();
        self.messages.lock().push(message.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = (self.respond)(message);
        self.gauge.exit();
        response
    }
}

/// Unary transport failing for a fixed set of tokens
pub(crate) struct StubUnary {
    failures: Vec<(String, UnaryFailure)>,
    delay: Duration,
    tokens: Mutex<Vec<PushToken>>,
    notifications: Mutex<Vec<ApnNotification>>,
    gauge: InFlight,
}

impl StubUnary {
    pub fn delivering() -> Self {
        Self {
            failures: Vec::new(),
            delay: Duration::ZERO,
            tokens: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            gauge: InFlight::default(),
        }
    }

    pub fn failing_for(tokens: &[&str], failure: UnaryFailure) -> Self {
        Self {
            failures: tokens
                .iter()
                .map(|t| (t.to_string(), failure.clone()))
                .collect(),
            ..Self::delivering()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.gauge.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.gauge.max.load(Ordering::SeqCst)
    }

    pub fn notifications(&self) -> Vec<ApnNotification> {
        self.notifications.lock().clone()
    }

    pub fn tokens(&self) -> Vec<PushToken> {
        self.tokens.lock().clone()
    }
}

#[async_trait]
impl UnaryTransport for StubUnary {
    async fn send(&self, token: &PushToken, notification: &ApnNotification) -> Result<(), UnaryFailure> {
        self.gauge.enter();
        self.tokens.lock().push(token.clone());
        self.notifications.lock().push(notification.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = match self.failures.iter().find(|(t, _)| t == token.as_str()) {
            Some((_, failure)) => Err(failure.clone()),
            None => Ok(()),
        };
        self.gauge.exit();
        result
    }
}

/// Feedback source handing out queued batches, then nothing
#[derive(Default)]
pub(crate) struct StubFeedbackSource {
    batches: Mutex<VecDeque<Vec<StaleDevice>>>,
    polls: AtomicUsize,
}

impl StubFeedbackSource {
    pub fn with_batches(batches: Vec<Vec<StaleDevice>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedbackSource for StubFeedbackSource {
    async fn fetch_stale_devices(&self) -> PushResult<Vec<StaleDevice>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.batches.lock().pop_front().unwrap_or_default())
    }
}

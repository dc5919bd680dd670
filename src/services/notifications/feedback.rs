//! In-process fan-out of token feedback.
//!
//! Adapters publish a [`FeedbackEvent`] after normalizing each provider
//! answer, and the APN feedback poller publishes the stale devices it
//! discovers. Every registered handler sees every non-empty event.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::models::{Backend, FeedbackEvent};

/// Receiver of feedback events
///
/// Handlers run synchronously on the publishing task and should return
/// quickly; hand heavy work off to a channel (see
/// [`FeedbackBus::subscribe_channel`]).
pub trait FeedbackHandler: Send + Sync {
    fn on_feedback(&self, event: &FeedbackEvent) -> anyhow::Result<()>;

    /// A closed handler will never accept another event and is dropped from the bus
    fn is_closed(&self) -> bool {
        false
    }
}

impl<F> FeedbackHandler for F
where
    F: Fn(&FeedbackEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_feedback(&self, event: &FeedbackEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Forwards events from one backend only
struct BackendFilter<H> {
    backend: Backend,
    inner: H,
}

impl<H: FeedbackHandler> FeedbackHandler for BackendFilter<H> {
    fn on_feedback(&self, event: &FeedbackEvent) -> anyhow::Result<()> {
        if event.source == self.backend {
            self.inner.on_feedback(event)
        } else {
            Ok(())
        }
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Forwards events into an unbounded channel
struct ChannelForwarder(mpsc::UnboundedSender<FeedbackEvent>);

impl FeedbackHandler for ChannelForwarder {
    fn on_feedback(&self, event: &FeedbackEvent) -> anyhow::Result<()> {
        self.0
            .send(event.clone())
            .map_err(|_| anyhow::anyhow!("feedback receiver dropped"))
    }

    fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Publish/subscribe hub for feedback events
///
/// Cloning is cheap and every clone shares the same subscriber list.
/// Registering the same handler twice delivers each event to it twice.
/// There is no explicit unsubscribe; a channel subscription whose receiver
/// was dropped is removed on the next publish.
#[derive(Clone, Default)]
pub struct FeedbackBus {
    handlers: Arc<RwLock<Vec<Arc<dyn FeedbackHandler>>>>,
}

impl FeedbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a closure handler
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&FeedbackEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_handler(Arc::new(handler));
    }

    /// Registers a shared handler object
    pub fn subscribe_handler(&self, handler: Arc<dyn FeedbackHandler>) {
        self.handlers.write().push(handler);
    }

    /// Registers a closure that only sees events produced by `backend`
    pub fn subscribe_backend<F>(&self, backend: Backend, handler: F)
    where
        F: Fn(&FeedbackEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_handler(Arc::new(BackendFilter {
            backend,
            inner: handler,
        }));
    }

    /// Returns a receiver that gets a copy of every published event
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<FeedbackEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe_handler(Arc::new(ChannelForwarder(tx)));
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Delivers `event` to every handler registered so far
    ///
    /// Empty events are dropped. A handler that errors or panics is logged
    /// and skipped; the remaining handlers still run. Returns the number of
    /// handlers that accepted the event.
    pub fn publish(&self, event: &FeedbackEvent) -> usize {
        if event.is_empty() {
            return 0;
        }

        // Snapshot so handlers may subscribe while we iterate
        let handlers: Vec<Arc<dyn FeedbackHandler>> = self.handlers.read().clone();

        let mut delivered = 0;
        let mut closed = 0;
        for (index, handler) in handlers.iter().enumerate() {
            if handler.is_closed() {
                closed += 1;
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| handler.on_feedback(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(
                        source = %event.source,
                        handler = index,
                        error = %e,
                        "Feedback handler failed"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        source = %event.source,
                        handler = index,
                        "Feedback handler panicked"
                    );
                }
            }
        }

        if closed > 0 {
            self.handlers.write().retain(|handler| !handler.is_closed());
            tracing::debug!(closed, "Dropped closed feedback subscriptions");
        }

        tracing::debug!(
            source = %event.source,
            updates = event.tokens_to_update.len(),
            removals = event.tokens_to_remove.len(),
            delivered,
            "Feedback published"
        );

        delivered
    }
}

impl std::fmt::Debug for FeedbackBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PushToken;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn removal(backend: Backend, token: &str) -> FeedbackEvent {
        FeedbackEvent::removal(backend, vec![PushToken::new(token)])
    }

    #[test]
    fn test_every_handler_receives_event() {
        let bus = FeedbackBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..3 {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |event: &FeedbackEvent| {
                seen.lock().unwrap().push(event.tokens_to_remove.clone());
                Ok(())
            });
        }

        assert_eq!(bus.publish(&removal(Backend::Fcm, "tokB")), 3);
        assert_eq!(seen.lock().unwrap().len(), 3);
        assert!(seen.lock().unwrap().iter().all(|t| t == &vec![PushToken::new("tokB")]));
    }

    #[test]
    fn test_duplicate_subscription_is_invoked_twice() {
        let bus = FeedbackBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let handler: Arc<dyn FeedbackHandler> = {
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &FeedbackEvent| -> anyhow::Result<()> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        bus.subscribe_handler(Arc::clone(&handler));
        bus.subscribe_handler(handler);

        bus.publish(&removal(Backend::Apn, "a"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failing_and_panicking_handlers_are_isolated() {
        let bus = FeedbackBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        bus.subscribe(|_: &FeedbackEvent| anyhow::bail!("registry unavailable"));
        bus.subscribe(|_: &FeedbackEvent| panic!("handler bug"));
        {
            let calls = Arc::clone(&calls);
            bus.subscribe(move |_: &FeedbackEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        assert_eq!(bus.publish(&removal(Backend::Gcm, "a")), 1);
        // Later publishes still reach everyone
        assert_eq!(bus.publish(&removal(Backend::Gcm, "b")), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_event_is_not_published() {
        let bus = FeedbackBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            bus.subscribe(move |_: &FeedbackEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        assert_eq!(bus.publish(&FeedbackEvent::new(Backend::Fcm)), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_backend_filter() {
        let bus = FeedbackBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            bus.subscribe_backend(Backend::Apn, move |event: &FeedbackEvent| {
                assert_eq!(event.source, Backend::Apn);
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        bus.publish(&removal(Backend::Fcm, "a"));
        bus.publish(&removal(Backend::Apn, "b"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_during_publish_keeps_existing_delivery() {
        let bus = FeedbackBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let inner_bus = bus.clone();
            let calls = Arc::clone(&calls);
            bus.subscribe(move |_: &FeedbackEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
                inner_bus.subscribe(|_: &FeedbackEvent| Ok(()));
                Ok(())
            });
        }

        assert_eq!(bus.publish(&removal(Backend::Fcm, "a")), 1);
        assert_eq!(bus.subscriber_count(), 2);
        assert_eq!(bus.publish(&removal(Backend::Fcm, "b")), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_channel_subscription() {
        let bus = FeedbackBus::new();
        let mut rx = bus.subscribe_channel();

        bus.publish(&removal(Backend::Apn, "dead"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.source, Backend::Apn);
        assert_eq!(event.tokens_to_remove, vec![PushToken::new("dead")]);

        drop(rx);
        assert_eq!(bus.publish(&removal(Backend::Apn, "again")), 0);
    }

    #[tokio::test]
    async fn test_dropped_channel_receivers_are_pruned() {
        let bus = FeedbackBus::new();
        let mut kept = bus.subscribe_channel();
        for _ in 0..5 {
            drop(bus.subscribe_channel());
        }
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            bus.subscribe(move |_: &FeedbackEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(bus.subscriber_count(), 7);

        assert_eq!(bus.publish(&removal(Backend::Fcm, "a")), 2);
        assert_eq!(bus.subscriber_count(), 2);
        assert_eq!(kept.recv().await.unwrap().tokens_to_remove, vec![PushToken::new("a")]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(kept);
        assert_eq!(bus.publish(&removal(Backend::Fcm, "b")), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

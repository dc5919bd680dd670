use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::feedback::FeedbackBus;
use super::normalizer::normalize_stale_devices;
use crate::error::{PushError, PushResult};
use crate::external::FeedbackSource;
use crate::models::Backend;

/// Periodic poller of an out-of-band feedback channel
///
/// Each tick fetches the devices the provider reports as gone and publishes
/// them as a removal event, independently of any send.
pub struct FeedbackPoller {
    scheduler: Arc<Mutex<JobScheduler>>,
    backend: Backend,
}

impl FeedbackPoller {
    /// Schedules polling of `source` every `interval` and starts the scheduler
    pub async fn start(
        backend: Backend,
        source: Arc<dyn FeedbackSource>,
        bus: FeedbackBus,
        interval: Duration,
    ) -> PushResult<Self> {
        let scheduler = JobScheduler::new().await.map_err(internal)?;

        let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
            let source = Arc::clone(&source);
            let bus = bus.clone();

            Box::pin(async move {
                if let Err(e) = poll_once(backend, source.as_ref(), &bus).await {
                    tracing::warn!(%backend, error = %e, "Feedback poll failed");
                }
            })
        })
        .map_err(internal)?;

        scheduler.add(job).await.map_err(internal)?;
        scheduler.start().await.map_err(internal)?;

        tracing::info!(
            %backend,
            interval_secs = interval.as_secs(),
            "Feedback polling started"
        );

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            backend,
        })
    }

    /// Stops polling gracefully
    pub async fn stop(&self) -> PushResult<()> {
        self.scheduler
            .lock()
            .await
            .shutdown()
            .await
            .map_err(internal)?;

        tracing::info!(backend = %self.backend, "Feedback polling stopped");
        Ok(())
    }
}

/// Fetches stale devices once and publishes them; returns how many were reported
pub async fn poll_once(
    backend: Backend,
    source: &dyn FeedbackSource,
    bus: &FeedbackBus,
) -> PushResult<usize> {
    let devices = source.fetch_stale_devices().await?;
    if devices.is_empty() {
        return Ok(0);
    }

    let event = normalize_stale_devices(backend, &devices);
    bus.publish(&event);

    tracing::info!(%backend, stale = devices.len(), "Stale devices reported by feedback channel");
    Ok(devices.len())
}

fn internal(e: tokio_cron_scheduler::JobSchedulerError) -> PushError {
    PushError::Internal {
        source: anyhow::Error::from(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::apple::StaleDevice;
    use crate::models::{FeedbackEvent, PushToken};
    use crate::services::notifications::testing::StubFeedbackSource;

    fn device(bytes: &[u8]) -> StaleDevice {
        StaleDevice {
            token: bytes.to_vec(),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_poll_once_publishes_hex_removals() {
        let source = StubFeedbackSource::with_batches(vec![vec![device(&[0xab, 0xcd])]]);
        let bus = FeedbackBus::new();
        let mut rx = bus.subscribe_channel();

        assert_eq!(poll_once(Backend::Apn, &source, &bus).await.unwrap(), 1);

        let event: FeedbackEvent = rx.recv().await.unwrap();
        assert_eq!(event.source, Backend::Apn);
        assert!(event.tokens_to_update.is_empty());
        assert_eq!(event.tokens_to_remove, vec![PushToken::new("abcd")]);
    }

    #[tokio::test]
    async fn test_empty_poll_publishes_nothing() {
        let source = StubFeedbackSource::default();
        let bus = FeedbackBus::new();
        let mut rx = bus.subscribe_channel();

        assert_eq!(poll_once(Backend::Apn, &source, &bus).await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scheduled_polling_publishes_and_stops() {
        let source = Arc::new(StubFeedbackSource::with_batches(vec![vec![device(&[0x01])]]));
        let bus = FeedbackBus::new();
        let mut rx = bus.subscribe_channel();

        let poller = FeedbackPoller::start(
            Backend::Apn,
            source.clone(),
            bus.clone(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("a feedback event within the timeout")
            .unwrap();
        assert_eq!(event.tokens_to_remove, vec![PushToken::new("01")]);

        poller.stop().await.unwrap();
        assert!(source.polls() >= 1);
    }
}

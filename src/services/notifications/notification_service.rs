//! Push service facade.
//!
//! Holds one write-once slot per backend adapter, the shared feedback bus and
//! the background feedback pollers. Adapters are initialized once and read
//! without locking afterwards.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use super::apn_provider::ApnProvider;
use super::dispatcher::{BatchDispatcher, dispatch_targets};
use super::fcm_provider::FcmProvider;
use super::feedback::FeedbackBus;
use super::feedback_poller::FeedbackPoller;
use super::gcm_provider::GcmProvider;
use super::provider::{DeliveryShape, PushAdapter};
use crate::config::{ApnConfig, DispatchConfig, MulticastConfig, Settings};
use crate::error::{PushError, PushResult};
use crate::external::google::LegacyHttpClient;
use crate::external::{FeedbackSource, MulticastTransport, UnaryTransport};
use crate::models::{
    Backend, BatchReport, BatchSummary, FeedbackEvent, Notification, PushToken, Recipient, Tokens,
    TokenUpdate, UnreadCounters,
};

/// Entry point for sending pushes and following token feedback
pub struct PushService {
    apn: OnceLock<Arc<dyn PushAdapter>>,
    fcm: OnceLock<Arc<dyn PushAdapter>>,
    gcm: OnceLock<Arc<dyn PushAdapter>>,
    bus: FeedbackBus,
    dispatch: DispatchConfig,
    pollers: Mutex<Vec<FeedbackPoller>>,
}

impl Default for PushService {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl PushService {
    /// Creates a service with no adapter initialized
    pub fn new(dispatch: DispatchConfig) -> Self {
        Self {
            apn: OnceLock::new(),
            fcm: OnceLock::new(),
            gcm: OnceLock::new(),
            bus: FeedbackBus::new(),
            dispatch,
            pollers: Mutex::new(Vec::new()),
        }
    }

    /// Creates a service and initializes the enabled Google backends over HTTP
    ///
    /// APN needs a transport owned by the host and is initialized separately
    /// with [`PushService::init_apn`].
    pub fn from_settings(settings: &Settings) -> PushResult<Self> {
        settings.validate()?;
        let service = Self::new(settings.dispatch.clone());

        if settings.fcm.enabled {
            service.init_fcm(settings.fcm.clone(), None)?;
        }
        if settings.gcm.enabled {
            service.init_gcm(settings.gcm.clone(), None)?;
        }
        if settings.apn.enabled {
            tracing::info!("APN is enabled and waits for a transport from the host");
        }

        Ok(service)
    }

    /// Initializes the APN adapter
    ///
    /// When a feedback source is given it is polled every
    /// `config.feedback_interval` seconds until [`PushService::shutdown`].
    ///
    /// # Errors
    /// `Configuration` on bad credentials or when APN is already initialized
    pub async fn init_apn(
        &self,
        config: ApnConfig,
        transport: Arc<dyn UnaryTransport>,
        feedback: Option<Arc<dyn FeedbackSource>>,
    ) -> PushResult<()> {
        self.ensure_vacant(Backend::Apn)?;

        let interval = config.feedback_interval();
        let provider = ApnProvider::initialize(config, transport)?;

        let poller = match feedback {
            Some(source) => {
                Some(FeedbackPoller::start(Backend::Apn, source, self.bus.clone(), interval).await?)
            }
            None => None,
        };

        if let Err(e) = self.install(Backend::Apn, Arc::new(provider)) {
            if let Some(poller) = poller {
                poller.stop().await?;
            }
            return Err(e);
        }

        if let Some(poller) = poller {
            self.pollers.lock().push(poller);
        }
        Ok(())
    }

    /// Initializes the FCM adapter; without a transport the legacy HTTP client is used
    pub fn init_fcm(
        &self,
        config: MulticastConfig,
        transport: Option<Arc<dyn MulticastTransport>>,
    ) -> PushResult<()> {
        self.ensure_vacant(Backend::Fcm)?;
        let transport = transport_or_http(Backend::Fcm, &config, transport)?;
        let provider = FcmProvider::initialize(config, transport)?;
        self.install(Backend::Fcm, Arc::new(provider))
    }

    /// Initializes the GCM adapter; without a transport the legacy HTTP client is used
    pub fn init_gcm(
        &self,
        config: MulticastConfig,
        transport: Option<Arc<dyn MulticastTransport>>,
    ) -> PushResult<()> {
        self.ensure_vacant(Backend::Gcm)?;
        let transport = transport_or_http(Backend::Gcm, &config, transport)?;
        let provider = GcmProvider::initialize(config, transport)?;
        self.install(Backend::Gcm, Arc::new(provider))
    }

    pub fn is_initialized(&self, backend: Backend) -> bool {
        self.slot(backend).get().is_some()
    }

    /// Sends to recipients of any platform, see [`BatchDispatcher::batch`]
    pub async fn batch(&self, recipients: &[Recipient], notification: &Notification) -> BatchReport {
        let dispatcher = Backend::ALL
            .iter()
            .filter_map(|backend| self.slot(*backend).get())
            .fold(
                BatchDispatcher::new(self.bus.clone(), self.dispatch.concurrency),
                |dispatcher, adapter| dispatcher.with_adapter(Arc::clone(adapter)),
            );

        dispatcher.batch(recipients, notification).await
    }

    /// Direct sender bound to one backend
    ///
    /// # Errors
    /// `Configuration` when the backend has not been initialized
    pub fn sender(&self, backend: Backend) -> PushResult<BackendSender> {
        let adapter = self.slot(backend).get().ok_or_else(|| {
            PushError::configuration(
                backend.as_str(),
                format!("{} is not configured yet", backend.as_str().to_uppercase()),
            )
        })?;

        Ok(BackendSender {
            adapter: Arc::clone(adapter),
            bus: self.bus.clone(),
        })
    }

    /// Registers a handler for token updates and removals from every backend
    ///
    /// Registering the same handler twice delivers each event to it twice.
    pub fn on_feedback<F>(&self, handler: F)
    where
        F: Fn(&[TokenUpdate], &[PushToken]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(move |event: &FeedbackEvent| {
            handler(&event.tokens_to_update, &event.tokens_to_remove)
        });
    }

    pub fn feedback_bus(&self) -> &FeedbackBus {
        &self.bus
    }

    /// Stops the feedback pollers
    pub async fn shutdown(&self) -> PushResult<()> {
        let pollers = std::mem::take(&mut *self.pollers.lock());
        for poller in &pollers {
            poller.stop().await?;
        }

        tracing::info!(pollers = pollers.len(), "Push service shut down");
        Ok(())
    }

    fn slot(&self, backend: Backend) -> &OnceLock<Arc<dyn PushAdapter>> {
        match backend {
            Backend::Apn => &self.apn,
            Backend::Fcm => &self.fcm,
            Backend::Gcm => &self.gcm,
        }
    }

    fn ensure_vacant(&self, backend: Backend) -> PushResult<()> {
        if self.is_initialized(backend) {
            return Err(already_initialized(backend));
        }
        Ok(())
    }

    fn install(&self, backend: Backend, adapter: Arc<dyn PushAdapter>) -> PushResult<()> {
        self.slot(backend)
            .set(adapter)
            .map_err(|_| already_initialized(backend))
    }
}

fn already_initialized(backend: Backend) -> PushError {
    PushError::configuration(
        backend.as_str(),
        format!("{} is already initialized", backend.as_str().to_uppercase()),
    )
}

fn transport_or_http(
    backend: Backend,
    config: &MulticastConfig,
    transport: Option<Arc<dyn MulticastTransport>>,
) -> PushResult<Arc<dyn MulticastTransport>> {
    match transport {
        Some(transport) => Ok(transport),
        None => Ok(Arc::new(LegacyHttpClient::new(
            backend,
            config.endpoint.clone(),
            config.server_key.clone(),
            config.retry_count,
        )?)),
    }
}

/// A direct send to one backend
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub tokens: Tokens,
    pub notification: Notification,
    pub unread: UnreadCounters,
}

impl SendRequest {
    pub fn new(tokens: impl Into<Tokens>, notification: Notification) -> Self {
        Self {
            tokens: tokens.into(),
            notification,
            unread: UnreadCounters::None,
        }
    }

    /// One counter for every token, or one per token in order
    pub fn with_unread(mut self, unread: impl Into<UnreadCounters>) -> Self {
        self.unread = unread.into();
        self
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.notification.sound = Some(sound.into());
        self
    }

    pub fn with_time_to_live(mut self, ttl: std::time::Duration) -> Self {
        self.notification.time_to_live = Some(ttl);
        self
    }
}

/// Sender bound to one initialized adapter
#[derive(Clone)]
pub struct BackendSender {
    adapter: Arc<dyn PushAdapter>,
    bus: FeedbackBus,
}

impl BackendSender {
    pub fn backend(&self) -> Backend {
        self.adapter.backend()
    }

    /// Sends one notification to every token of the request
    ///
    /// Unary backends fan out under the adapter's own concurrency limit.
    ///
    /// An empty request, or one holding a single blank token, sends nothing
    /// and returns an empty summary.
    ///
    /// # Errors
    /// * `Validation` for a blank token among several, too many tokens or an
    ///   oversized payload, before any provider call
    /// * `FatalProvider` when the provider rejected the credentials
    pub async fn send(&self, request: SendRequest) -> PushResult<BatchSummary> {
        let SendRequest {
            tokens: Tokens(tokens),
            notification,
            unread,
        } = request;

        // No token, or a lone blank one, is a no-op
        let nothing_to_send = match tokens.as_slice() {
            [] => true,
            [only] => only.is_blank(),
            _ => false,
        };
        if nothing_to_send {
            return Ok(BatchSummary::default());
        }

        if let Some(position) = tokens.iter().position(PushToken::is_blank) {
            return Err(PushError::validation(
                "tokens",
                format!("Empty push token at position {position}"),
            ));
        }

        let backend = self.adapter.backend();
        if let DeliveryShape::Multicast { max_batch } = self.adapter.shape()
            && tokens.len() > max_batch
        {
            return Err(PushError::validation(
                "tokens",
                format!(
                    "{} accepts at most {max_batch} tokens per send, got {}",
                    backend.as_str().to_uppercase(),
                    tokens.len()
                ),
            ));
        }

        let targets = unread.pair(tokens);
        for target in &targets {
            self.adapter.validate(target, &notification)?;
        }

        let mut report = dispatch_targets(
            &self.adapter,
            targets,
            &notification,
            self.adapter.concurrency(),
            &self.bus,
        )
        .await;

        if !report.fatal_errors.is_empty() {
            return Err(report.fatal_errors.swap_remove(0));
        }

        tracing::info!(
            %backend,
            successful = report.summary.successful,
            failed = report.summary.failed,
            "Push sent"
        );
        Ok(report.summary)
    }
}

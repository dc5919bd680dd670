//! Legacy FCM/GCM HTTP transport.
//!
//! Posts one JSON downstream message per call and returns the provider's
//! multicast response untouched; interpreting per-token results is left to the
//! result normalizer.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;

use super::types::{MulticastMessage, MulticastResponse};
use crate::error::{PushError, PushResult};
use crate::external::client::build_http_client;
use crate::external::transport::MulticastTransport;
use crate::models::Backend;

pub const FCM_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";
pub const GCM_ENDPOINT: &str = "https://gcm-http.googleapis.com/gcm/send";

const BASE_RETRY_DELAY_MS: u64 = 1000;
const MAX_RETRY_DELAY_MS: u64 = 60_000;
const RETRY_JITTER_MS: u64 = 500;

/// HTTP client for the legacy Google messaging endpoints
#[derive(Debug, Clone)]
pub struct LegacyHttpClient {
    backend: Backend,
    endpoint: String,
    server_key: String,
    retry_count: u32,
    http: reqwest::Client,
}

impl LegacyHttpClient {
    /// Creates a client for `backend` authenticated with `server_key`
    ///
    /// # Arguments
    /// * `endpoint` - Override of the provider URL; defaults per backend
    /// * `retry_count` - Extra attempts on network errors and 5xx responses
    pub fn new(
        backend: Backend,
        endpoint: Option<String>,
        server_key: impl Into<String>,
        retry_count: u32,
    ) -> PushResult<Self> {
        let server_key = server_key.into();
        if server_key.trim().is_empty() {
            return Err(PushError::configuration(
                format!("{backend}.server_key"),
                format!("The provided {} key is empty", backend.as_str().to_uppercase()),
            ));
        }

        let endpoint = endpoint.unwrap_or_else(|| Self::default_endpoint(backend).to_string());
        let http = build_http_client().map_err(|e| {
            PushError::configuration(format!("{backend}.http_client"), e.to_string())
        })?;

        Ok(Self {
            backend,
            endpoint,
            server_key,
            retry_count,
            http,
        })
    }

    pub fn default_endpoint(backend: Backend) -> &'static str {
        match backend {
            Backend::Gcm => GCM_ENDPOINT,
            _ => FCM_ENDPOINT,
        }
    }

    fn build_request(&self, message: &MulticastMessage) -> reqwest::RequestBuilder {
        self.http
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(message)
    }

    /// Exponential backoff with jitter, capped at one minute
    fn retry_delay(attempt: u32) -> Duration {
        let exp = BASE_RETRY_DELAY_MS.saturating_mul(1u64 << attempt.min(16));
        let jitter = rand::rng().random_range(0..RETRY_JITTER_MS);
        Duration::from_millis(exp.min(MAX_RETRY_DELAY_MS) + jitter)
    }
}

#[async_trait]
impl MulticastTransport for LegacyHttpClient {
    async fn send(&self, message: &MulticastMessage) -> PushResult<MulticastResponse> {
        let mut attempt = 0u32;

        loop {
            let failure = match self.build_request(message).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<MulticastResponse>()
                            .await
                            .map_err(|e| PushError::transport(self.backend, e));
                    }

                    if status == StatusCode::UNAUTHORIZED {
                        return Err(PushError::FatalProvider {
                            backend: self.backend,
                            reason: "The server key was rejected by the provider (401)".to_string(),
                        });
                    }

                    if status.is_client_error() {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(PushError::validation(
                            "message",
                            format!("Provider rejected the request ({status}): {body}"),
                        ));
                    }

                    anyhow::anyhow!("Provider responded with {status}")
                }
                Err(e) => anyhow::Error::from(e),
            };

            if attempt >= self.retry_count {
                return Err(PushError::transport(self.backend, failure));
            }

            let delay = Self::retry_delay(attempt);
            tracing::warn!(
                backend = %self.backend,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Provider call failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> MulticastMessage {
        MulticastMessage {
            to: None,
            registration_ids: vec!["a".to_string(), "b".to_string()],
            collapse_key: "hello".to_string(),
            priority: Some("normal".to_string()),
            content_available: Some(true),
            delay_while_idle: false,
            time_to_live: 3600,
            dry_run: true,
            notification: None,
            data: None,
        }
    }

    #[test]
    fn test_empty_key_is_configuration_error() {
        let result = LegacyHttpClient::new(Backend::Fcm, None, "  ", 3);
        assert!(matches!(result, Err(PushError::Configuration { .. })));
    }

    #[test]
    fn test_default_endpoints() {
        let fcm = LegacyHttpClient::new(Backend::Fcm, None, "key", 0).unwrap();
        assert_eq!(fcm.endpoint, FCM_ENDPOINT);

        let gcm = LegacyHttpClient::new(Backend::Gcm, None, "key", 0).unwrap();
        assert_eq!(gcm.endpoint, GCM_ENDPOINT);

        let custom = LegacyHttpClient::new(
            Backend::Fcm,
            Some("http://localhost:9999/send".to_string()),
            "key",
            0,
        )
        .unwrap();
        assert_eq!(custom.endpoint, "http://localhost:9999/send");
    }

    #[test]
    fn test_request_carries_key_and_json() {
        let client = LegacyHttpClient::new(Backend::Fcm, None, "secret", 0).unwrap();
        let request = client.build_request(&message()).build().unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), FCM_ENDPOINT);
        assert_eq!(request.headers()["Authorization"], "key=secret");
        assert_eq!(request.headers()["content-type"], "application/json");
    }

    #[test]
    fn test_retry_delay_grows_and_caps() {
        let first = LegacyHttpClient::retry_delay(0);
        assert!(first >= Duration::from_millis(1000));
        assert!(first < Duration::from_millis(1500));

        let third = LegacyHttpClient::retry_delay(2);
        assert!(third >= Duration::from_millis(4000));

        let capped = LegacyHttpClient::retry_delay(30);
        assert!(capped < Duration::from_millis(MAX_RETRY_DELAY_MS + RETRY_JITTER_MS));
    }
}

use std::time::Duration;

/// Builds the pooled HTTP client used by provider transports
///
/// One client is created per transport and reused for the process lifetime, so
/// connections to the provider stay pooled across sends.
///
/// # Features
/// - **Timeouts**: 30s request timeout, 10s connect timeout
/// - **Connection pooling**: idle connections kept for 90s
/// - **HTTP/2**: adaptive window sizing and keep-alive pings
/// - **Security**: Rustls for TLS (no OpenSSL dependency)
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        // Timeouts
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        // Connection pooling
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        // HTTP/2 settings
        .http2_adaptive_window(true)
        .http2_keep_alive_interval(Duration::from_secs(10))
        .http2_keep_alive_timeout(Duration::from_secs(20))
        .user_agent(concat!("push-dispatch/", env!("CARGO_PKG_VERSION")))
        .build()
}

//! API client construction.
//!
//! A client is a base [`HttpClient`] wrapped by independent decorators, each
//! of which is itself an [`ApiClient`]:
//!
//! | Decorator | Adds |
//! |-----------|------|
//! | [`LoggingClient`] | a debug event per request |
//! | [`TimeoutClient`] | a per-request deadline |
//! | [`ConcurrencyLimitClient`] | a cap on in-flight requests shared by all clients |
//! | [`RateLimitClient`] | one retry after a short rate-limit wait |
//!
//! [`HttpClientFactory`] composes them from [`ClientOptions`] whenever the
//! authenticator needs a client for new [`Credentials`].

pub mod ext;
pub mod http;
pub mod limit;
pub mod logging;
pub mod rate_limit;
pub mod timeout;

pub use ext::ApiClientExt;
pub use http::HttpClient;
pub use limit::ConcurrencyLimitClient;
pub use logging::LoggingClient;
pub use rate_limit::RateLimitClient;
pub use timeout::TimeoutClient;

use hookwise_core::{Credentials, SharedClient};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::auth::issuer::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};

/// Builds clients for credentials.
pub trait ClientFactory: Send + Sync + 'static {
    /// Build a client authenticated with `credentials`.
    fn build(&self, credentials: Credentials) -> SharedClient;
}

impl<F> ClientFactory for F
where
    F: Fn(Credentials) -> SharedClient + Send + Sync + 'static,
{
    fn build(&self, credentials: Credentials) -> SharedClient {
        (self)(credentials)
    }
}

/// Default for [`ClientOptions::rate_limit_max_wait`].
pub const DEFAULT_RATE_LIMIT_MAX_WAIT: Duration = Duration::from_secs(60);

/// Which decorators wrap the base client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// API root.
    pub base_url: String,
    /// `User-Agent` header.
    pub user_agent: String,
    /// Per-request deadline.
    pub timeout: Option<Duration>,
    /// Maximum in-flight requests across all clients.
    pub max_concurrent_requests: Option<usize>,
    /// Longest rate-limit wait retried once; `None` never retries.
    pub rate_limit_max_wait: Option<Duration>,
    /// Log each request at debug level.
    pub log_requests: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            max_concurrent_requests: None,
            rate_limit_max_wait: Some(DEFAULT_RATE_LIMIT_MAX_WAIT),
            log_requests: true,
        }
    }
}

/// Builds decorated [`HttpClient`]s sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
    options: ClientOptions,
    permits: Option<Arc<Semaphore>>,
}

impl HttpClientFactory {
    /// Create a factory.
    pub fn new(options: ClientOptions) -> Self {
        Self::with_http_client(reqwest::Client::new(), options)
    }

    /// Create a factory reusing an existing `reqwest` client.
    pub fn with_http_client(http: reqwest::Client, options: ClientOptions) -> Self {
        let permits = options
            .max_concurrent_requests
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        Self {
            http,
            options,
            permits,
        }
    }

    /// The options clients are built with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(&self, credentials: Credentials) -> SharedClient {
        let mut client: SharedClient = Arc::new(HttpClient::new(
            self.http.clone(),
            self.options.base_url.clone(),
            self.options.user_agent.clone(),
            credentials,
        ));
        if let Some(duration) = self.options.timeout {
            client = Arc::new(TimeoutClient::new(client, duration));
        }
        if let Some(permits) = &self.permits {
            client = Arc::new(ConcurrencyLimitClient::new(client, Arc::clone(permits)));
        }
        if let Some(max_wait) = self.options.rate_limit_max_wait {
            client = Arc::new(RateLimitClient::new(client, max_wait));
        }
        if self.options.log_requests {
            client = Arc::new(LoggingClient::new(client));
        }
        client
    }
}

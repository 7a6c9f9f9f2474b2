//! Request logging decorator.

use async_trait::async_trait;
use hookwise_core::{ApiClient, ApiRequest, ApiResponse, ClientError, ClientScope};
use tokio::time::Instant;

/// A client that logs every request it forwards.
pub struct LoggingClient<C> {
    inner: C,
}

impl<C> LoggingClient<C> {
    /// Wrap a client.
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: ApiClient> ApiClient for LoggingClient<C> {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let started = Instant::now();

        let result = self.inner.request(request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => tracing::debug!(
                %method,
                %path,
                status = response.status,
                elapsed_ms,
                "API request"
            ),
            Err(err) => tracing::debug!(%method, %path, elapsed_ms, %err, "API request failed"),
        }
        result
    }

    fn scope(&self) -> ClientScope {
        self.inner.scope()
    }
}

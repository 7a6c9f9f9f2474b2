//! Timeout decorator for time-limited requests.

use async_trait::async_trait;
use hookwise_core::{ApiClient, ApiRequest, ApiResponse, ClientError, ClientScope};
use std::time::Duration;
use tokio::time::timeout;

/// A client that fails requests taking longer than a fixed duration.
pub struct TimeoutClient<C> {
    inner: C,
    duration: Duration,
}

impl<C> TimeoutClient<C> {
    /// Wrap a client.
    pub fn new(inner: C, duration: Duration) -> Self {
        Self { inner, duration }
    }
}

#[async_trait]
impl<C: ApiClient> ApiClient for TimeoutClient<C> {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        match timeout(self.duration, self.inner.request(request)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(self.duration)),
        }
    }

    fn scope(&self) -> ClientScope {
        self.inner.scope()
    }
}

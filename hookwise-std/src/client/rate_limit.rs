//! Rate limit decorator.

use async_trait::async_trait;
use hookwise_core::{ApiClient, ApiRequest, ApiResponse, ClientError, ClientScope};
use std::time::Duration;
use tokio::time::sleep;

/// A client that waits out a rate limit and retries the request once.
///
/// Only [`ClientError::RateLimited`] is retried, and only when the requested
/// wait is at most `max_wait`. A second rate limit is returned to the caller.
pub struct RateLimitClient<C> {
    inner: C,
    max_wait: Duration,
}

impl<C> RateLimitClient<C> {
    /// Wrap a client, waiting at most `max_wait` before the retry.
    pub fn new(inner: C, max_wait: Duration) -> Self {
        Self { inner, max_wait }
    }
}

#[async_trait]
impl<C: ApiClient> ApiClient for RateLimitClient<C> {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        match self.inner.request(request.clone()).await {
            Err(ClientError::RateLimited {
                status,
                retry_after,
                ..
            }) if retry_after <= self.max_wait => {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    status,
                    retry_after_secs = retry_after.as_secs(),
                    "rate limited; retrying once"
                );
                sleep(retry_after).await;
                self.inner.request(request).await
            }
            result => result,
        }
    }

    fn scope(&self) -> ClientScope {
        self.inner.scope()
    }
}

//! Concurrency limiting decorator.

use async_trait::async_trait;
use hookwise_core::{ApiClient, ApiRequest, ApiResponse, ClientError, ClientScope};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// A client that caps in-flight requests.
///
/// The semaphore is shared, so every client built with the same one counts
/// against the same limit.
pub struct ConcurrencyLimitClient<C> {
    inner: C,
    permits: Arc<Semaphore>,
}

impl<C> ConcurrencyLimitClient<C> {
    /// Wrap a client, drawing permits from `permits`.
    pub fn new(inner: C, permits: Arc<Semaphore>) -> Self {
        Self { inner, permits }
    }
}

#[async_trait]
impl<C: ApiClient> ApiClient for ConcurrencyLimitClient<C> {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ClientError::Transport(Box::new(e)))?;
        self.inner.request(request).await
    }

    fn scope(&self) -> ClientScope {
        self.inner.scope()
    }
}

//! # Handlers
//!
//! A handler is the user function invoked for every event its pattern
//! matches. It receives the event and the per-event [`Context`] and may fail.
//!
//! # Usage Patterns
//!
//! 1. **Direct closure**: `|event, ctx| async move { ... }`
//! 2. **Struct implementation**: `impl Handler for MyHandler`
//!
//! Both may resolve to `()` or to `Result<(), E>` for any error convertible
//! into [`BoxError`].

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::error::BoxError;
use crate::event::Event;

/// Conversion of a handler's output into success or failure.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid handler output",
    label = "handlers must resolve to `()` or `Result<(), E>`",
    note = "`E` must convert into `Box<dyn Error + Send + Sync>`."
)]
pub trait IntoOutcome {
    /// Convert the output.
    fn into_outcome(self) -> Result<(), BoxError>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<(), BoxError> {
        match self {
            Ok(t) => t.into_outcome(),
            Err(e) => Err(e.into()),
        }
    }
}

/// A function invoked for matching events.
///
/// This trait uses native `async fn` for static dispatch. The registry stores
/// handlers as [`DynHandler`] trait objects.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an event handler",
    label = "missing `Handler` implementation",
    note = "Use a closure `|event: Arc<Event>, ctx: Context| async move {{ .. }}` or implement `Handler`."
)]
pub trait Handler: Send + Sync + 'static {
    /// Handle one event.
    fn call(
        &self,
        event: Arc<Event>,
        context: Context,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<Event>, Context) -> Fut + Send + Sync + 'static,
    Fut: Future + Send,
    Fut::Output: IntoOutcome,
{
    async fn call(&self, event: Arc<Event>, context: Context) -> Result<(), BoxError> {
        (self)(event, context).await.into_outcome()
    }
}

/// Object-safe version of [`Handler`].
pub trait DynHandler: Send + Sync + 'static {
    /// Handle one event (dynamic dispatch version).
    fn call_dyn(&self, event: Arc<Event>, context: Context) -> BoxFuture<'_, Result<(), BoxError>>;
}

// Blanket implementation: Any type implementing Handler implements DynHandler automatically.
impl<T: Handler> DynHandler for T {
    fn call_dyn(&self, event: Arc<Event>, context: Context) -> BoxFuture<'_, Result<(), BoxError>> {
        Box::pin(self.call(event, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiClient, ApiRequest, ApiResponse, ClientScope};
    use crate::error::ClientError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Span;

    struct NullClient;

    #[async_trait]
    impl ApiClient for NullClient {
        async fn request(&self, _request: ApiRequest) -> Result<ApiResponse, ClientError> {
            Ok(ApiResponse::default())
        }

        fn scope(&self) -> ClientScope {
            ClientScope::App
        }
    }

    fn call_args() -> (Arc<Event>, Context) {
        let event = Arc::new(Event::new("d-1", "issues", json!({ "action": "opened" })));
        let context = Context::new(Arc::clone(&event), Arc::new(NullClient), Span::none());
        (event, context)
    }

    #[tokio::test]
    async fn closure_runs_through_dyn_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler: Arc<dyn DynHandler> = Arc::new(move |event: Arc<Event>, _ctx: Context| {
            let counter = Arc::clone(&counter);
            async move {
                assert_eq!(event.action(), Some("opened"));
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let (event, context) = call_args();
        handler.call_dyn(event, context).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_output_becomes_boxed_error() {
        async fn rejects(_event: Arc<Event>, _ctx: Context) -> Result<(), std::io::Error> {
            Err(std::io::Error::other("rate limited"))
        }

        let (event, context) = call_args();
        let err = rejects.call_dyn(event, context).await.unwrap_err();

        assert_eq!(err.to_string(), "rate limited");
    }
}

//! # Event Dispatch
//!
//! The [`Dispatcher`] turns one webhook event into an authenticated
//! [`Context`] and runs every matching handler.
//!
//! # Overview
//!
//! For each event the dispatcher:
//!
//! 1. authenticates as the event's installation, or as the app when the
//!    payload has no installation or the installation was just deleted;
//! 2. builds one [`Context`] with a span carrying the delivery id;
//! 3. resolves the matching handlers through a [`HandlerProvider`];
//! 4. starts all of them concurrently and waits for every one to settle;
//! 5. logs each failure and returns the first one.
//!
//! A handler that fails straight away, one that fails after suspending, and
//! one that panics are all reported the same way. Siblings of a failing
//! handler always run to completion.
//!
//! # Example
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(registry, authenticator);
//! let report = dispatcher.receive(event).await?;
//! println!("Executed {} handlers", report.handled);
//! ```

use futures::FutureExt;
use futures::future::join_all;
use hookwise_core::{Context, DispatchError, Event, HandlerError};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

use crate::auth::Authenticator;
use crate::registry::{HandlerRegistry, Registration};
use crate::routing::HandlerProvider;

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Number of handlers that ran. Zero when nothing matched.
    pub handled: usize,
}

/// Runs the handlers of a [`HandlerProvider`] for incoming events.
pub struct Dispatcher<P = HandlerRegistry> {
    provider: Arc<P>,
    authenticator: Authenticator,
}

impl<P> Clone for Dispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            authenticator: self.authenticator.clone(),
        }
    }
}

impl<P: HandlerProvider> Dispatcher<P> {
    /// Create a dispatcher.
    pub fn new(provider: P, authenticator: Authenticator) -> Self {
        Self::from_shared(Arc::new(provider), authenticator)
    }

    /// Create a dispatcher over a provider that is shared elsewhere.
    pub fn from_shared(provider: Arc<P>, authenticator: Authenticator) -> Self {
        Self {
            provider,
            authenticator,
        }
    }

    /// The handler provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The authenticator used to build contexts.
    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Dispatch one event.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Auth`] when no client could be built, in which
    /// case no handler runs, and [`DispatchError::Handler`] with the first
    /// failure in start order when any handler fails. Every failure is
    /// logged at error level with the event attached.
    pub async fn receive(
        &self,
        event: impl Into<Arc<Event>>,
    ) -> Result<DispatchReport, DispatchError> {
        let event: Arc<Event> = event.into();
        let span = tracing::info_span!(
            "event",
            id = %event.id,
            name = %event.name,
            action = event.action().unwrap_or_default(),
        );
        self.dispatch(event, span.clone()).instrument(span).await
    }

    async fn dispatch(
        &self,
        event: Arc<Event>,
        span: tracing::Span,
    ) -> Result<DispatchReport, DispatchError> {
        let client = self.authenticator.auth(event.auth_installation()).await?;

        if event.is_installation_removal() {
            if let Some(id) = event.installation_id() {
                self.authenticator.invalidate(id);
            }
        }

        let context = Context::new(Arc::clone(&event), client, span);
        let registrations = self.provider.resolve_event(&event);
        if registrations.is_empty() {
            tracing::debug!("no handlers matched");
            return Ok(DispatchReport::default());
        }
        tracing::debug!(handlers = registrations.len(), "dispatching event");

        let invocations = registrations
            .iter()
            .map(|registration| invoke(registration, Arc::clone(&event), context.clone()));
        let results = join_all(invocations).await;

        let handled = results.len();
        let mut first_failure = None;
        for result in results {
            if let Err(err) = result {
                tracing::error!(err = %err, event = ?event, "handler failed");
                first_failure.get_or_insert(err);
            }
        }

        match first_failure {
            Some(err) => Err(DispatchError::Handler(err)),
            None => Ok(DispatchReport { handled }),
        }
    }
}

// The handler is called inside the polled future, so a panic while it builds
// its future is caught the same way as one raised after a suspension.
async fn invoke(
    registration: &Registration,
    event: Arc<Event>,
    context: Context,
) -> Result<(), HandlerError> {
    let handler = Arc::clone(registration.handler());
    let outcome = AssertUnwindSafe(async move { handler.call_dyn(event, context).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(HandlerError::Failed {
            pattern: registration.pattern().key(),
            source,
        }),
        Err(payload) => Err(HandlerError::Panicked {
            pattern: registration.pattern().key(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

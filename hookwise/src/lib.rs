//! # hookwise - Webhook Event Dispatch
//!
//! `hookwise` routes webhook events from a GitHub App to the handlers that
//! subscribed to them, each with an API client already authenticated as the
//! installation the event came from.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hookwise::prelude::*;
//!
//! hookwise::telemetry::init(LogFormat::from_env());
//!
//! let mut builder = AppBuilder::from_config(&AppConfig::from_env()?)?;
//! builder.on(["issues.opened", "pull_request.opened"], |event: Arc<Event>, ctx: Context| async move {
//!     tracing::info!(parent: ctx.log(), repo = ?ctx.repo()?, "new item");
//!     Ok::<_, BoxError>(())
//! })?;
//! let app = builder.build();
//!
//! // For every delivery the transport receives:
//! let event = Event::from_webhook(delivery_id, event_name, &body)?;
//! app.receive(event).await?;
//! ```
//!
//! ## Patterns
//!
//! | Pattern | Runs for |
//! |---------|----------|
//! | `*` | every event |
//! | `issues` | every `issues` event, whatever the action |
//! | `issues.opened` | `issues` events with action `opened` |

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod app;
pub mod telemetry;

pub use app::{App, AppBuilder};

pub use hookwise_core::{
    ApiClient, ApiRequest, ApiResponse, AuthError, BoxError, ClientError, ClientScope, Context,
    ContextError, Credentials, DispatchError, DynHandler, Event, EventPattern, Handler,
    HandlerError, InstallationId, IntoOutcome, IntoPatterns, IssueRef, Method, RegistryError,
    RepoRef, SharedClient,
};

pub use hookwise_std::{
    ApiClientExt, AppConfig, Authenticator, ClientFactory, ClientOptions, ConfigError,
    DispatchReport, Dispatcher, GitHubAppIssuer, HandlerProvider, HandlerRegistry,
    HttpClientFactory, IssuedToken, Registration, RegistryBuilder, TokenCache, TokenIssuer,
};

/// API client implementations and decorators.
pub mod client {
    pub use hookwise_std::client::{
        ConcurrencyLimitClient, HttpClient, LoggingClient, RateLimitClient, TimeoutClient,
    };
}

/// Testing utilities.
pub mod testing {
    pub use hookwise_std::testing::{
        Call, CapturedEvent, LogCapture, MockClient, MockClientFactory, RecordingHandler,
        StubIssuer,
    };
}

/// Prelude module - common imports for hookwise.
///
/// # Usage
///
/// ```rust,ignore
/// use hookwise::prelude::*;
/// ```
pub mod prelude {
    pub use crate::telemetry::LogFormat;
    pub use crate::{
        ApiClient, ApiClientExt, ApiRequest, App, AppBuilder, AppConfig, BoxError, Context,
        DispatchError, Event, Handler, InstallationId, RegistryError,
    };
    pub use std::sync::Arc;
}

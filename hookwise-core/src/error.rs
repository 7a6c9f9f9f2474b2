//! Error types for hookwise.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`DispatchError`] - Errors surfaced by a dispatch to the transport
//! - [`AuthError`] - Token signing and issuance failures
//! - [`HandlerError`] - Failures of individual handlers
//! - [`ClientError`] - Failures of API requests made through a client
//! - [`RegistryError`] - Invalid registrations
//! - [`ContextError`] - Payload data a context helper could not find

use std::time::Duration;
use thiserror::Error;

use crate::event::InstallationId;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by a dispatch.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No client could be built for the event.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// At least one handler failed; this is the first one in start order.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Errors raised while authenticating as the app or an installation.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The app JWT could not be signed.
    #[error("failed to sign app token: {0}")]
    Signing(String),

    /// The issuer refused to create an installation token.
    #[error("token issuance for installation {installation} failed with status {status}: {message}")]
    Issuance {
        /// Installation the token was requested for.
        installation: InstallationId,
        /// HTTP status returned by the issuer.
        status: u16,
        /// Message returned by the issuer.
        message: String,
    },

    /// The issuer could not be reached.
    #[error("token issuance request failed")]
    Transport(#[source] BoxError),

    /// The issuer answered with something that is not a token.
    #[error("invalid token response: {0}")]
    InvalidResponse(String),
}

/// A failed handler invocation.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("handler for `{pattern}` failed: {source}")]
    Failed {
        /// Pattern the handler was registered under.
        pattern: String,
        /// The handler's error.
        #[source]
        source: BoxError,
    },

    /// The handler panicked.
    #[error("handler for `{pattern}` panicked: {message}")]
    Panicked {
        /// Pattern the handler was registered under.
        pattern: String,
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl HandlerError {
    /// Pattern of the failing registration.
    pub fn pattern(&self) -> &str {
        match self {
            HandlerError::Failed { pattern, .. } | HandlerError::Panicked { pattern, .. } => {
                pattern
            }
        }
    }
}

/// Errors from API requests.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request could not be sent or the response not read.
    #[error("request failed")]
    Transport(#[source] BoxError),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `message` field of the error body, or the raw body.
        message: String,
    },

    /// The API refused the request until a rate limit resets.
    #[error("rate limited ({status}), retry after {retry_after:?}: {message}")]
    RateLimited {
        /// HTTP status code, 403 or 429.
        status: u16,
        /// How long the API asked the caller to wait.
        retry_after: Duration,
        /// `message` field of the error body, or the raw body.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request did not finish in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A GraphQL query returned errors.
    #[error("GraphQL query failed: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors raised while registering handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The pattern is not `*`, `name` or `name.action`.
    #[error("invalid event pattern `{0}`")]
    InvalidPattern(String),

    /// A registration listed no patterns at all.
    #[error("registration must name at least one event pattern")]
    NoPatterns,
}

/// Errors from [`Context`](crate::Context) helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The payload lacks a field the helper needs.
    #[error("event `{event}` has no `{field}` in its payload")]
    MissingField {
        /// Name of the event.
        event: String,
        /// Dotted path of the missing field.
        field: &'static str,
    },
}

// Convenience conversions
impl From<BoxError> for ClientError {
    fn from(err: BoxError) -> Self {
        ClientError::Transport(err)
    }
}

//! # hookwise-core
//!
//! Core types and traits for the hookwise webhook dispatch framework.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! handler libraries that don't need the full `hookwise-std` implementation.
//!
//! # Pieces
//!
//! ## Events ([`Event`])
//!
//! A webhook delivery: id, name and JSON payload. The payload's `action` and
//! `installation.id` decide routing and authentication.
//!
//! ## Patterns ([`EventPattern`])
//!
//! What a handler subscribes to: `*`, `name` or `name.action`.
//!
//! ## Clients ([`ApiClient`])
//!
//! The opaque authenticated request-capable object. Implementations and
//! decorators live in `hookwise-std`.
//!
//! ## Context and Handlers ([`Context`], [`Handler`])
//!
//! Each matching handler is called with the event and a [`Context`] that
//! bundles the event, a client for the event's installation, and a span
//! scoped to the event.
//!
//! # Error Types
//!
//! - [`DispatchError`] - What a dispatch returns to the transport
//! - [`AuthError`] - Authentication failures
//! - [`HandlerError`] - Handler failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod client;
mod context;
mod error;
mod event;
mod handler;
mod pattern;

// Re-exports
pub use client::{ApiClient, ApiRequest, ApiResponse, ClientScope, Credentials, SharedClient};
pub use context::{Context, IssueRef, RepoRef};
pub use error::{
    AuthError, BoxError, ClientError, ContextError, DispatchError, HandlerError, RegistryError,
};
pub use event::{Event, InstallationId};
pub use handler::{DynHandler, Handler, IntoOutcome};
pub use http::Method;
pub use pattern::{EventPattern, IntoPatterns, WILDCARD};

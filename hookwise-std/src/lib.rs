//! # hookwise-std
//!
//! Standard implementations for the hookwise webhook dispatch framework.
//!
//! This crate provides:
//! - **Authentication**: [`Authenticator`], [`TokenCache`], [`GitHubAppIssuer`]
//! - **API clients**: [`HttpClientFactory`] and the client decorators
//! - **Registration**: [`RegistryBuilder`], [`HandlerRegistry`]
//! - **Routing**: [`HandlerProvider`]
//! - **Dispatch**: [`Dispatcher`]
//! - **Configuration**: [`AppConfig`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use hookwise_core;

// Modules
pub mod auth;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod registry;
pub mod routing;
pub mod testing;

pub use auth::{Authenticator, GitHubAppIssuer, IssuedToken, TokenCache, TokenIssuer};
pub use client::{ApiClientExt, ClientFactory, ClientOptions, HttpClientFactory};
pub use config::{AppConfig, ConfigError};
pub use dispatch::{DispatchReport, Dispatcher};
pub use registry::{HandlerRegistry, Registration, RegistryBuilder};
pub use routing::HandlerProvider;

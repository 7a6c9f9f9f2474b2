//! Authentication against the event source's API.
//!
//! This module provides the pieces the dispatcher uses to build a client for
//! each event:
//!
//! - [`TokenIssuer`]: signs app JWTs and issues installation tokens
//! - [`TokenCache`]: keeps installation tokens until shortly before expiry
//! - [`Authenticator`]: combines both with a [`ClientFactory`](crate::client::ClientFactory)

pub mod authenticator;
pub mod cache;
pub mod issuer;

pub use authenticator::Authenticator;
pub use cache::TokenCache;
pub use issuer::{GitHubAppIssuer, IssuedToken, TokenIssuer};

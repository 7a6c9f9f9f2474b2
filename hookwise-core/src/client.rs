//! The authenticated API client seam.
//!
//! The dispatch core treats the remote API client as an opaque object that
//! can send requests with some [`Credentials`]. Concrete clients, and the
//! decorators layered on top of them, live in `hookwise-std`.

use async_trait::async_trait;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ClientError;
use crate::event::InstallationId;

/// What a client is authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientScope {
    /// The application itself (app JWT).
    App,
    /// One installation of the application.
    Installation(InstallationId),
}

/// Bearer credentials a client sends with each request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Short-lived JWT signed with the app's private key.
    App {
        /// Signed JWT.
        jwt: String,
    },
    /// Installation access token.
    Installation {
        /// Installation the token belongs to.
        id: InstallationId,
        /// Access token.
        token: String,
    },
}

impl Credentials {
    /// The value for the `Authorization: Bearer` header.
    pub fn bearer(&self) -> &str {
        match self {
            Credentials::App { jwt } => jwt,
            Credentials::Installation { token, .. } => token,
        }
    }

    /// The scope these credentials grant.
    pub fn scope(&self) -> ClientScope {
        match self {
            Credentials::App { .. } => ClientScope::App,
            Credentials::Installation { id, .. } => ClientScope::Installation(*id),
        }
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::App { .. } => f.debug_struct("App").finish_non_exhaustive(),
            Credentials::Installation { id, .. } => f
                .debug_struct("Installation")
                .field("id", id)
                .finish_non_exhaustive(),
        }
    }
}

/// A request against the API.
///
/// `path` is relative to the client's base URL (`/repos/o/r/issues`) or an
/// absolute URL, as found in `Link` headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path or absolute URL.
    pub path: String,
    /// Query string parameters.
    pub query: Vec<(String, String)>,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// A request with no query, headers or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// `GET path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path` with a JSON body.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).json(body)
    }

    /// `PATCH path` with a JSON body.
    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).json(body)
    }

    /// `PUT path` with a JSON body.
    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).json(body)
    }

    /// `DELETE path`
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A response from the API.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: HashMap<String, String>,
    /// JSON body, `Null` when empty.
    pub body: Value,
}

impl ApiResponse {
    /// A `200` response with the given body.
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body,
        }
    }

    /// Add a header (name is lowercased).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Deserialize the body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(T::deserialize(&self.body)?)
    }

    /// URL of the next page from the `Link` header.
    pub fn next_page(&self) -> Option<&str> {
        self.header("link")?.split(',').find_map(|part| {
            let (url, params) = part.split_once(';')?;
            params
                .split(';')
                .any(|p| p.trim() == r#"rel="next""#)
                .then(|| url.trim().trim_start_matches('<').trim_end_matches('>'))
        })
    }
}

/// An authenticated, request-capable API client.
///
/// Decorators implement this trait by wrapping another `ApiClient`, so
/// behaviour is layered by composition at construction time.
#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    /// Send a request.
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;

    /// What this client is authenticated as.
    fn scope(&self) -> ClientScope;
}

/// A client shared between the context and the handlers of one event.
pub type SharedClient = Arc<dyn ApiClient>;

#[async_trait]
impl<C: ApiClient + ?Sized> ApiClient for Arc<C> {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        (**self).request(request).await
    }

    fn scope(&self) -> ClientScope {
        (**self).scope()
    }
}

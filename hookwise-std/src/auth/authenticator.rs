//! Builds authenticated clients, reusing cached installation tokens.

use hookwise_core::{AuthError, Credentials, InstallationId, SharedClient};
use std::fmt;
use std::sync::Arc;

use crate::auth::cache::TokenCache;
use crate::auth::issuer::TokenIssuer;
use crate::client::ClientFactory;

/// Hands out clients authenticated as the app or as one installation.
///
/// Cloning is cheap and clones share the token cache, so handlers can keep a
/// clone to authenticate outside the context they were given.
///
/// # Example
///
/// ```rust,ignore
/// let app_client = authenticator.auth(None).await?;
/// let installation_client = authenticator.auth(Some(InstallationId::new(42))).await?;
/// ```
#[derive(Clone)]
pub struct Authenticator {
    issuer: Arc<dyn TokenIssuer>,
    cache: Arc<TokenCache>,
    clients: Arc<dyn ClientFactory>,
}

impl Authenticator {
    /// Create an authenticator with a default token cache.
    pub fn new(issuer: impl TokenIssuer, clients: impl ClientFactory) -> Self {
        Self::with_cache(issuer, clients, TokenCache::new())
    }

    /// Create an authenticator with a configured token cache.
    pub fn with_cache(issuer: impl TokenIssuer, clients: impl ClientFactory, cache: TokenCache) -> Self {
        Self {
            issuer: Arc::new(issuer),
            cache: Arc::new(cache),
            clients: Arc::new(clients),
        }
    }

    /// The token cache.
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// A client for the installation, or for the app when `installation` is `None`.
    ///
    /// App clients are signed on every call. Installation clients reuse a
    /// cached token while it is live and otherwise issue a new one; two
    /// concurrent misses for the same installation may both issue.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when signing or issuance fails. A failed issuance
    /// leaves the cache untouched.
    pub async fn auth(&self, installation: Option<InstallationId>) -> Result<SharedClient, AuthError> {
        let credentials = match installation {
            None => Credentials::App {
                jwt: self.issuer.app_jwt()?,
            },
            Some(id) => Credentials::Installation {
                id,
                token: self.installation_token(id).await?,
            },
        };
        Ok(self.clients.build(credentials))
    }

    /// Forget the cached token for an installation.
    pub fn invalidate(&self, installation: InstallationId) -> bool {
        self.cache.invalidate(installation)
    }

    async fn installation_token(&self, id: InstallationId) -> Result<String, AuthError> {
        if let Some(token) = self.cache.get(id) {
            tracing::debug!(installation = %id, "reusing cached installation token");
            return Ok(token);
        }

        let issued = self.issuer.create_installation_token(id).await?;
        match self.cache.insert(id, issued.token.clone(), issued.expires_in) {
            Some(_) => tracing::debug!(
                installation = %id,
                expires_in_secs = issued.expires_in.as_secs(),
                "issued installation token"
            ),
            None => tracing::warn!(
                installation = %id,
                expires_in_secs = issued.expires_in.as_secs(),
                "installation token expires within the safety margin; not caching it"
            ),
        }
        Ok(issued.token)
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("cached_tokens", &self.cache.len())
            .finish_non_exhaustive()
    }
}

//! Credential issuance.
//!
//! A [`TokenIssuer`] signs short-lived app JWTs with the app's private key and
//! exchanges them for installation access tokens. [`GitHubAppIssuer`] talks to
//! the GitHub REST API; tests substitute a stub.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookwise_core::{AuthError, InstallationId};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Default GitHub API root.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default `User-Agent` sent with issuance requests.
pub const DEFAULT_USER_AGENT: &str = concat!("hookwise/", env!("CARGO_PKG_VERSION"));

/// Seconds the JWT `iat` is backdated to absorb clock drift.
const CLOCK_DRIFT_SECONDS: i64 = 30;

/// Lifetime of an app JWT; GitHub rejects anything over ten minutes.
const APP_JWT_TTL_SECONDS: i64 = 600;

/// A freshly issued installation token.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Access token.
    pub token: String,
    /// Remaining lifetime as stated by the issuer.
    pub expires_in: Duration,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Signs app credentials and issues installation tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync + 'static {
    /// Sign a JWT authenticating as the app itself.
    fn app_jwt(&self) -> Result<String, AuthError>;

    /// Create an access token scoped to one installation.
    async fn create_installation_token(
        &self,
        installation: InstallationId,
    ) -> Result<IssuedToken, AuthError>;
}

#[derive(Debug, Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Issues credentials for a GitHub App.
pub struct GitHubAppIssuer {
    app_id: u64,
    key: EncodingKey,
    base_url: String,
    user_agent: String,
    http: reqwest::Client,
}

impl GitHubAppIssuer {
    /// Create an issuer from the app id and its PEM encoded RSA private key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] when the key cannot be parsed.
    pub fn new(app_id: u64, private_key_pem: &str) -> Result<Self, AuthError> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| AuthError::Signing(format!("invalid private key: {e}")))?;
        Ok(Self {
            app_id,
            key,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http: reqwest::Client::new(),
        })
    }

    /// Use another API root, e.g. a GitHub Enterprise Server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use another `User-Agent`.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Share an existing HTTP client.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The app id tokens are issued for.
    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    fn claims(&self, now: DateTime<Utc>) -> AppClaims {
        let iat = now.timestamp() - CLOCK_DRIFT_SECONDS;
        AppClaims {
            iat,
            exp: iat + APP_JWT_TTL_SECONDS,
            iss: self.app_id.to_string(),
        }
    }
}

impl fmt::Debug for GitHubAppIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubAppIssuer")
            .field("app_id", &self.app_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenIssuer for GitHubAppIssuer {
    fn app_jwt(&self) -> Result<String, AuthError> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &self.claims(Utc::now()),
            &self.key,
        )
        .map_err(|e| AuthError::Signing(e.to_string()))
    }

    async fn create_installation_token(
        &self,
        installation: InstallationId,
    ) -> Result<IssuedToken, AuthError> {
        let jwt = self.app_jwt()?;
        let url = format!(
            "{}/app/installations/{installation}/access_tokens",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(jwt)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| AuthError::Transport(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(AuthError::Issuance {
                installation,
                status: status.as_u16(),
                message,
            });
        }

        let body: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let expires_in = (body.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        Ok(IssuedToken {
            token: body.token,
            expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_garbage_key() {
        let err = GitHubAppIssuer::new(1, "not a pem").unwrap_err();
        assert!(matches!(err, AuthError::Signing(_)));
    }

    #[test]
    fn token_response_parses_github_shape() {
        let body = r#"{"token":"ghs_abc","expires_at":"2030-01-01T00:00:00Z","permissions":{}}"#;
        let parsed: AccessTokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.token, "ghs_abc");
        assert_eq!(
            parsed.expires_at,
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn issued_token_debug_hides_token() {
        let token = IssuedToken {
            token: "ghs_secret".into(),
            expires_in: Duration::from_secs(3600),
        };
        assert!(!format!("{token:?}").contains("ghs_secret"));
    }
}

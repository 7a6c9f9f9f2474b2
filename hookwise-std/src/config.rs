//! Application configuration.
//!
//! [`AppConfig`] holds everything needed to authenticate as a GitHub App and
//! to build API clients. It can be deserialized, built in code, or read from
//! the environment with [`AppConfig::from_env`]:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `APP_ID` | `app_id` | required |
//! | `PRIVATE_KEY` | `private_key` | required unless `PRIVATE_KEY_PATH` is set |
//! | `PRIVATE_KEY_PATH` | `private_key` (file contents) | |
//! | `GHE_HOST`, `GHE_PROTOCOL` | `base_url` = `{protocol}://{host}/api/v3` | `https` |
//! | `BASE_URL` | `base_url` | `https://api.github.com` |
//! | `TOKEN_SAFETY_MARGIN_SECS` | `token_safety_margin_secs` | 60 |
//! | `TOKEN_CACHE_CAPACITY` | `token_cache_capacity` | 15000 |
//! | `REQUEST_TIMEOUT_SECS` | `request_timeout_secs` | none |
//! | `MAX_CONCURRENT_REQUESTS` | `max_concurrent_requests` | none |
//! | `RATE_LIMIT_MAX_WAIT_SECS` | `rate_limit_max_wait_secs` (0 disables retry) | 60 |
//! | `LOG_REQUESTS` | `log_requests` | true |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::auth::cache::{DEFAULT_CAPACITY, DEFAULT_SAFETY_MARGIN, TokenCache};
use crate::auth::issuer::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT, GitHubAppIssuer};
use crate::client::{ClientOptions, DEFAULT_RATE_LIMIT_MAX_WAIT};

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("{0} is required")]
    Missing(&'static str),

    /// A setting has an unusable value.
    #[error("{name} is invalid: {message}")]
    Invalid {
        /// Setting name.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The private key file could not be read.
    #[error("failed to read private key from {path}")]
    ReadKey {
        /// Path from `PRIVATE_KEY_PATH`.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Settings for one GitHub App.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Numeric app id.
    pub app_id: Option<u64>,
    /// PEM encoded RSA private key.
    pub private_key: Option<String>,
    /// API root.
    pub base_url: String,
    /// `User-Agent` for every request.
    pub user_agent: String,
    /// Cached tokens are treated as expired this many seconds early.
    pub token_safety_margin_secs: u64,
    /// Maximum number of cached installation tokens.
    pub token_cache_capacity: usize,
    /// Per-request deadline for API clients.
    pub request_timeout_secs: Option<u64>,
    /// Maximum in-flight API requests across all clients.
    pub max_concurrent_requests: Option<usize>,
    /// Longest rate-limit wait that is retried once; 0 never retries.
    pub rate_limit_max_wait_secs: u64,
    /// Log each API request at debug level.
    pub log_requests: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            private_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            token_safety_margin_secs: DEFAULT_SAFETY_MARGIN.as_secs(),
            token_cache_capacity: DEFAULT_CAPACITY,
            request_timeout_secs: None,
            max_concurrent_requests: None,
            rate_limit_max_wait_secs: DEFAULT_RATE_LIMIT_MAX_WAIT.as_secs(),
            log_requests: true,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_id", &self.app_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("token_safety_margin_secs", &self.token_safety_margin_secs)
            .field("token_cache_capacity", &self.token_cache_capacity)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("rate_limit_max_wait_secs", &self.rate_limit_max_wait_secs)
            .field("log_requests", &self.log_requests)
            .finish()
    }
}

impl AppConfig {
    /// Read configuration from the process environment and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable cannot be parsed, the key file
    /// cannot be read, or the result fails [`AppConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`AppConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let mut config = Self::default();

        config.app_id = env.parse("APP_ID")?;

        if let Some(pem) = env.string("PRIVATE_KEY") {
            config.private_key = Some(normalize_pem(&pem));
        }
        if let Some(path) = env.string("PRIVATE_KEY_PATH") {
            if config.private_key.is_some() {
                return Err(ConfigError::Invalid {
                    name: "PRIVATE_KEY_PATH",
                    message: "cannot be set together with PRIVATE_KEY".to_string(),
                });
            }
            let pem = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::ReadKey { path, source })?;
            config.private_key = Some(normalize_pem(&pem));
        }

        if let Some(host) = env.string("GHE_HOST") {
            let protocol = env.string("GHE_PROTOCOL").unwrap_or_else(|| "https".to_string());
            config.base_url = format!("{protocol}://{host}/api/v3");
        }
        if let Some(base_url) = env.string("BASE_URL") {
            config.base_url = base_url;
        }

        if let Some(secs) = env.parse::<u64>("TOKEN_SAFETY_MARGIN_SECS")? {
            config.token_safety_margin_secs = secs;
        }
        if let Some(capacity) = env.parse::<usize>("TOKEN_CACHE_CAPACITY")? {
            config.token_cache_capacity = capacity;
        }
        config.request_timeout_secs = env.parse("REQUEST_TIMEOUT_SECS")?;
        config.max_concurrent_requests = env.parse("MAX_CONCURRENT_REQUESTS")?;
        if let Some(secs) = env.parse::<u64>("RATE_LIMIT_MAX_WAIT_SECS")? {
            config.rate_limit_max_wait_secs = secs;
        }
        if let Some(log_requests) = env.bool("LOG_REQUESTS")? {
            config.log_requests = log_requests;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used to build an app.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.app_id {
            None => return Err(ConfigError::Missing("APP_ID")),
            Some(0) => {
                return Err(ConfigError::Invalid {
                    name: "APP_ID",
                    message: "must be positive".to_string(),
                });
            }
            Some(_) => {}
        }
        if self.private_key.as_deref().is_none_or(|key| key.trim().is_empty()) {
            return Err(ConfigError::Missing("PRIVATE_KEY"));
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(ConfigError::Invalid {
                name: "BASE_URL",
                message: format!("`{}` is not an http(s) URL", self.base_url),
            });
        }
        if self.token_cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_CACHE_CAPACITY",
                message: "must be positive".to_string(),
            });
        }
        if self.max_concurrent_requests == Some(0) {
            return Err(ConfigError::Invalid {
                name: "MAX_CONCURRENT_REQUESTS",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Safety margin as a duration.
    pub fn token_safety_margin(&self) -> Duration {
        Duration::from_secs(self.token_safety_margin_secs)
    }

    /// Issuer signing with the configured key against the configured API.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the app id or key is missing or the key
    /// is not a valid RSA key.
    pub fn issuer(&self) -> Result<GitHubAppIssuer, ConfigError> {
        let app_id = self.app_id.ok_or(ConfigError::Missing("APP_ID"))?;
        let key = self
            .private_key
            .as_deref()
            .ok_or(ConfigError::Missing("PRIVATE_KEY"))?;
        let issuer = GitHubAppIssuer::new(app_id, key).map_err(|e| ConfigError::Invalid {
            name: "PRIVATE_KEY",
            message: e.to_string(),
        })?;
        Ok(issuer
            .with_base_url(self.base_url.clone())
            .with_user_agent(self.user_agent.clone()))
    }

    /// Options for the API clients handed to handlers.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.base_url.clone(),
            user_agent: self.user_agent.clone(),
            timeout: self.request_timeout_secs.map(Duration::from_secs),
            max_concurrent_requests: self.max_concurrent_requests,
            rate_limit_max_wait: (self.rate_limit_max_wait_secs > 0)
                .then(|| Duration::from_secs(self.rate_limit_max_wait_secs)),
            log_requests: self.log_requests,
        }
    }

    /// An empty token cache sized and margined per this configuration.
    pub fn token_cache(&self) -> TokenCache {
        TokenCache::new()
            .with_safety_margin(self.token_safety_margin())
            .with_capacity(self.token_cache_capacity)
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn parse<T>(&self, name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: fmt::Display,
    {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        v.parse::<T>().map(Some).map_err(|e| ConfigError::Invalid {
            name,
            message: e.to_string(),
        })
    }

    fn bool(&self, name: &'static str) -> Result<Option<bool>, ConfigError> {
        let Some(v) = self.string(name) else {
            return Ok(None);
        };
        match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid {
                name,
                message: format!("`{v}` is not a boolean"),
            }),
        }
    }
}

// Keys passed through single-line variables carry literal `\n` sequences.
fn normalize_pem(pem: &str) -> String {
    let trimmed = pem.trim();
    if trimmed.contains("\\n") && !trimmed.contains('\n') {
        trimmed.replace("\\n", "\n")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let config = load(&[("APP_ID", "12"), ("PRIVATE_KEY", "key")]).unwrap();

        assert_eq!(config.app_id, Some(12));
        assert_eq!(config.base_url, "https://api.github.com");
        assert_eq!(config.token_safety_margin(), Duration::from_secs(60));
        assert_eq!(config.token_cache_capacity, 15_000);
        assert!(config.log_requests);
    }

    #[test]
    fn escaped_newlines_in_key_are_normalised() {
        let config = load(&[
            ("APP_ID", "1"),
            ("PRIVATE_KEY", "-----BEGIN-----\\nabc\\n-----END-----"),
        ])
        .unwrap();
        assert_eq!(
            config.private_key.as_deref(),
            Some("-----BEGIN-----\nabc\n-----END-----")
        );
    }

    #[test]
    fn enterprise_host_builds_base_url() {
        let config = load(&[
            ("APP_ID", "1"),
            ("PRIVATE_KEY", "key"),
            ("GHE_HOST", "git.example.com"),
            ("GHE_PROTOCOL", "http"),
        ])
        .unwrap();
        assert_eq!(config.base_url, "http://git.example.com/api/v3");
    }

    #[test]
    fn client_options_follow_config() {
        let config = load(&[
            ("APP_ID", "1"),
            ("PRIVATE_KEY", "key"),
            ("REQUEST_TIMEOUT_SECS", "10"),
            ("MAX_CONCURRENT_REQUESTS", "8"),
            ("LOG_REQUESTS", "off"),
        ])
        .unwrap();
        let options = config.client_options();
        assert_eq!(options.timeout, Some(Duration::from_secs(10)));
        assert_eq!(options.max_concurrent_requests, Some(8));
        assert_eq!(options.rate_limit_max_wait, Some(Duration::from_secs(60)));
        assert!(!options.log_requests);
    }

    #[test]
    fn zero_rate_limit_wait_disables_retry() {
        let config = load(&[
            ("APP_ID", "1"),
            ("PRIVATE_KEY", "key"),
            ("RATE_LIMIT_MAX_WAIT_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.client_options().rate_limit_max_wait, None);

        let config = load(&[
            ("APP_ID", "1"),
            ("PRIVATE_KEY", "key"),
            ("RATE_LIMIT_MAX_WAIT_SECS", "15"),
        ])
        .unwrap();
        assert_eq!(
            config.client_options().rate_limit_max_wait,
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn missing_and_malformed_values_are_rejected() {
        assert!(matches!(
            load(&[("PRIVATE_KEY", "key")]),
            Err(ConfigError::Missing("APP_ID"))
        ));
        assert!(matches!(
            load(&[("APP_ID", "1")]),
            Err(ConfigError::Missing("PRIVATE_KEY"))
        ));
        assert!(matches!(
            load(&[("APP_ID", "one"), ("PRIVATE_KEY", "key")]),
            Err(ConfigError::Invalid { name: "APP_ID", .. })
        ));
        assert!(matches!(
            load(&[("APP_ID", "1"), ("PRIVATE_KEY", "key"), ("TOKEN_CACHE_CAPACITY", "0")]),
            Err(ConfigError::Invalid { name: "TOKEN_CACHE_CAPACITY", .. })
        ));
    }

    #[test]
    fn debug_hides_the_private_key() {
        let config = load(&[("APP_ID", "1"), ("PRIVATE_KEY", "super-secret")]).unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}

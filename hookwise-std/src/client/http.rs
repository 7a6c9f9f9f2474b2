//! The base HTTP client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hookwise_core::{ApiClient, ApiRequest, ApiResponse, ClientError, ClientScope, Credentials};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Media type GitHub recommends for REST requests.
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Wait for a 429 that names no reset time.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Sends requests with `reqwest`, authenticated with fixed credentials.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    credentials: Credentials,
}

impl HttpClient {
    /// Create a client for `base_url` using `credentials`.
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            user_agent: user_agent.into(),
            credentials,
        }
    }

    /// Absolute URL for a request path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        }
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut builder = self
            .http
            .request(request.method, self.url(&request.path))
            .bearer_auth(self.credentials.bearer())
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(USER_AGENT, &self.user_agent);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(Box::new(e)))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(Box::new(e)))?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            if let Some(retry_after) = rate_limit_wait(status, &headers, Utc::now()) {
                return Err(ClientError::RateLimited {
                    status,
                    retry_after,
                    message,
                });
            }
            return Err(ClientError::Status { status, message });
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    fn scope(&self) -> ClientScope {
        self.credentials.scope()
    }
}

/// How long a 403 or 429 response asks the caller to wait, if it is a rate
/// limit at all.
///
/// `retry-after` (seconds) wins. Otherwise an exhausted primary limit
/// (`x-ratelimit-remaining: 0`) waits until `x-ratelimit-reset`. A bare 429
/// waits a minute; a bare 403 is a permission error, not a rate limit.
pub(crate) fn rate_limit_wait(
    status: u16,
    headers: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> Option<Duration> {
    if status != 403 && status != 429 {
        return None;
    }
    if let Some(secs) = headers
        .get("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return Some(Duration::from_secs(secs));
    }
    if headers.get("x-ratelimit-remaining").map(|v| v.trim()) == Some("0") {
        if let Some(reset) = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
        {
            let secs = (reset - now.timestamp()).max(0);
            return Some(Duration::from_secs(secs.unsigned_abs()));
        }
    }
    (status == 429).then_some(DEFAULT_RATE_LIMIT_WAIT)
}

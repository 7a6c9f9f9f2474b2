//! # Event Context
//!
//! The value each handler receives alongside the event: the event itself, a
//! client authenticated for the event's installation, and a logger scoped to
//! the event.
//!
//! A context is built once per dispatched event and cloned into every
//! matching handler. Cloning is cheap; all fields are reference counted.
//!
//! # Payload helpers
//!
//! The helpers below read common fields of GitHub payloads so handlers do
//! not have to walk the JSON by hand:
//!
//! ```rust,ignore
//! let issue = ctx.issue()?;
//! ctx.client()
//!     .request(ApiRequest::post(
//!         format!("/repos/{}/{}/issues/{}/comments", issue.owner, issue.repo, issue.number),
//!         json!({ "body": "Thanks for opening this!" }),
//!     ))
//!     .await?;
//! ```

use serde_json::Value;
use std::sync::Arc;
use tracing::Span;

use crate::client::{ClientScope, SharedClient};
use crate::error::ContextError;
use crate::event::{Event, InstallationId};

/// Owner and name of the repository an event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Account login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

/// An issue or pull request an event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    /// Account login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Issue or pull request number.
    pub number: u64,
}

/// Per-event context handed to handlers.
#[derive(Clone)]
pub struct Context {
    event: Arc<Event>,
    client: SharedClient,
    log: Span,
}

impl Context {
    /// Create a context.
    pub fn new(event: Arc<Event>, client: SharedClient, log: Span) -> Self {
        Self { event, client, log }
    }

    /// The event being handled.
    pub fn event(&self) -> &Arc<Event> {
        &self.event
    }

    /// Delivery id.
    pub fn id(&self) -> &str {
        &self.event.id
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.event.name
    }

    /// Event action, if any.
    pub fn action(&self) -> Option<&str> {
        self.event.action()
    }

    /// The webhook payload.
    pub fn payload(&self) -> &Value {
        &self.event.payload
    }

    /// Client authenticated for this event.
    pub fn client(&self) -> &SharedClient {
        &self.client
    }

    /// Span scoped to this event. Handler futures already run inside it.
    pub fn log(&self) -> &Span {
        &self.log
    }

    /// The installation the client is bound to, if any.
    pub fn installation_id(&self) -> Option<InstallationId> {
        match self.client.scope() {
            ClientScope::Installation(id) => Some(id),
            ClientScope::App => None,
        }
    }

    /// `true` when the event was triggered by a bot account.
    pub fn is_bot(&self) -> bool {
        self.payload()
            .pointer("/sender/type")
            .and_then(Value::as_str)
            == Some("Bot")
    }

    /// The repository the event belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::MissingField`] when the payload carries no
    /// `repository`.
    pub fn repo(&self) -> Result<RepoRef, ContextError> {
        let repository = self
            .payload()
            .get("repository")
            .ok_or_else(|| self.missing("repository"))?;
        let owner = repository
            .pointer("/owner/login")
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing("repository.owner.login"))?;
        let repo = repository
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing("repository.name"))?;

        Ok(RepoRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// The issue or pull request the event belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::MissingField`] when the payload carries no
    /// repository or no issue / pull request number.
    pub fn issue(&self) -> Result<IssueRef, ContextError> {
        let RepoRef { owner, repo } = self.repo()?;
        let payload = self.payload();
        let number = ["/issue/number", "/pull_request/number", "/number"]
            .iter()
            .find_map(|path| payload.pointer(path).and_then(Value::as_u64))
            .ok_or_else(|| self.missing("issue.number"))?;

        Ok(IssueRef {
            owner,
            repo,
            number,
        })
    }

    fn missing(&self, field: &'static str) -> ContextError {
        ContextError::MissingField {
            event: self.event.name.clone(),
            field,
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("event", &self.event.id)
            .field("name", &self.event.name)
            .field("scope", &self.client.scope())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiClient, ApiRequest, ApiResponse};
    use crate::error::ClientError;
    use async_trait::async_trait;
    use serde_json::json;

    struct NullClient(ClientScope);

    #[async_trait]
    impl ApiClient for NullClient {
        async fn request(&self, _request: ApiRequest) -> Result<ApiResponse, ClientError> {
            Ok(ApiResponse::default())
        }

        fn scope(&self) -> ClientScope {
            self.0
        }
    }

    fn context(name: &str, payload: Value, scope: ClientScope) -> Context {
        Context::new(
            Arc::new(Event::new("d-1", name, payload)),
            Arc::new(NullClient(scope)),
            Span::none(),
        )
    }

    #[test]
    fn issue_from_issue_payload() {
        let ctx = context(
            "issues",
            json!({
                "action": "opened",
                "issue": { "number": 12 },
                "repository": { "name": "widgets", "owner": { "login": "acme" } },
                "sender": { "type": "User" }
            }),
            ClientScope::Installation(InstallationId::new(1)),
        );

        assert_eq!(
            ctx.issue().unwrap(),
            IssueRef {
                owner: "acme".into(),
                repo: "widgets".into(),
                number: 12
            }
        );
        assert_eq!(ctx.action(), Some("opened"));
        assert_eq!(ctx.installation_id(), Some(InstallationId::new(1)));
        assert!(!ctx.is_bot());
    }

    #[test]
    fn issue_from_pull_request_payload() {
        let ctx = context(
            "pull_request",
            json!({
                "pull_request": { "number": 3 },
                "repository": { "name": "r", "owner": { "login": "o" } },
                "sender": { "type": "Bot" }
            }),
            ClientScope::App,
        );
        assert_eq!(ctx.issue().unwrap().number, 3);
        assert!(ctx.is_bot());
        assert_eq!(ctx.installation_id(), None);
    }

    #[test]
    fn missing_repository_is_reported() {
        let ctx = context("installation", json!({}), ClientScope::App);
        assert_eq!(
            ctx.repo(),
            Err(ContextError::MissingField {
                event: "installation".into(),
                field: "repository"
            })
        );
    }
}

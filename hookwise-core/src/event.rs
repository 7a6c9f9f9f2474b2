//! Inbound webhook events.
//!
//! An [`Event`] is what the transport hands to the dispatcher after the
//! webhook signature has been checked and the body parsed. It is immutable
//! once received and is shared between handlers as `Arc<Event>`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of an installation of the application on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(u64);

impl InstallationId {
    /// Wrap a raw installation id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for InstallationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single webhook delivery.
///
/// `name` is the source event type (the `X-GitHub-Event` header) and
/// `payload` the parsed JSON body. The optional `action` and
/// `installation.id` fields of the payload drive routing and authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Delivery id (the `X-GitHub-Delivery` header).
    pub id: String,
    /// Event type, e.g. `issues`.
    pub name: String,
    /// Parsed webhook body.
    pub payload: Value,
}

impl Event {
    /// Create an event from its parts.
    pub fn new(id: impl Into<String>, name: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            payload,
        }
    }

    /// Build an event from a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns an error when `body` is not valid JSON.
    pub fn from_webhook(
        id: impl Into<String>,
        name: impl Into<String>,
        body: &[u8],
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(id, name, serde_json::from_slice(body)?))
    }

    /// The `action` field of the payload, if present.
    pub fn action(&self) -> Option<&str> {
        self.payload.get("action").and_then(Value::as_str)
    }

    /// The `installation.id` field of the payload, if present.
    pub fn installation_id(&self) -> Option<InstallationId> {
        self.payload
            .get("installation")
            .and_then(|installation| installation.get("id"))
            .and_then(Value::as_u64)
            .map(InstallationId::new)
    }

    /// `true` for the event GitHub sends when the app is uninstalled.
    ///
    /// The installation can no longer mint tokens once this arrives.
    pub fn is_installation_removal(&self) -> bool {
        self.name == "installation" && self.action() == Some("deleted")
    }

    /// The installation this event should be authenticated as.
    ///
    /// `None` when the payload has no installation, or when the installation
    /// has just been removed.
    pub fn auth_installation(&self) -> Option<InstallationId> {
        if self.is_installation_removal() {
            return None;
        }
        self.installation_id()
    }

    /// `name` or `name.action`.
    pub fn routing_key(&self) -> String {
        match self.action() {
            Some(action) => format!("{}.{}", self.name, action),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_action_and_installation() {
        let event = Event::new(
            "1",
            "issues",
            json!({ "action": "opened", "installation": { "id": 42 } }),
        );
        assert_eq!(event.action(), Some("opened"));
        assert_eq!(event.installation_id(), Some(InstallationId::new(42)));
        assert_eq!(event.auth_installation(), Some(InstallationId::new(42)));
        assert_eq!(event.routing_key(), "issues.opened");
    }

    #[test]
    fn event_without_action_routes_by_name() {
        let event = Event::new("1", "push", json!({ "ref": "refs/heads/main" }));
        assert_eq!(event.action(), None);
        assert_eq!(event.installation_id(), None);
        assert_eq!(event.routing_key(), "push");
    }

    #[test]
    fn deleted_installation_is_not_authenticated() {
        let event = Event::new(
            "1",
            "installation",
            json!({ "action": "deleted", "installation": { "id": 7 } }),
        );
        assert!(event.is_installation_removal());
        assert_eq!(event.installation_id(), Some(InstallationId::new(7)));
        assert_eq!(event.auth_installation(), None);
    }

    #[test]
    fn parses_webhook_body() {
        let event = Event::from_webhook("abc", "ping", br#"{"zen":"Keep it simple."}"#).unwrap();
        assert_eq!(event.payload["zen"], "Keep it simple.");
        assert!(Event::from_webhook("abc", "ping", b"not json").is_err());
    }
}

#![allow(dead_code)]

use hookwise::testing::{MockClientFactory, StubIssuer};
use hookwise::{AppBuilder, Authenticator, Event, TokenCache};
use serde_json::{Value, json};

pub const DELIVERY_ID: &str = "72d3162e-cc78-11e3-81ab-4c9367dc0958";

// ============================================================================
// Test App
// ============================================================================

/// Builder wired to stub credentials, plus handles to inspect them.
pub struct Harness {
    pub issuer: StubIssuer,
    pub clients: MockClientFactory,
    pub builder: AppBuilder,
}

pub fn harness() -> Harness {
    harness_with(StubIssuer::new(), TokenCache::new())
}

pub fn harness_with(issuer: StubIssuer, cache: TokenCache) -> Harness {
    let clients = MockClientFactory::new();
    let authenticator = Authenticator::with_cache(issuer.clone(), clients.clone(), cache);
    Harness {
        issuer,
        clients,
        builder: AppBuilder::new(authenticator),
    }
}

// ============================================================================
// Test Events
// ============================================================================

pub fn event(name: &str, payload: Value) -> Event {
    Event::new(DELIVERY_ID, name, payload)
}

pub fn issues(action: &str, installation: u64) -> Event {
    event(
        "issues",
        json!({
            "action": action,
            "installation": { "id": installation },
            "repository": { "name": "hello-world", "owner": { "login": "octocat" } },
            "issue": { "number": 7 },
            "sender": { "login": "octocat", "type": "User" },
        }),
    )
}

pub fn installation_deleted(installation: u64) -> Event {
    event(
        "installation",
        json!({ "action": "deleted", "installation": { "id": installation } }),
    )
}

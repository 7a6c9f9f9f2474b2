//! # Event Routing
//!
//! Decides which registered handlers apply to an event. An event named `N`
//! with action `A` is matched against three keys, and every registration
//! under any of them is selected:
//!
//! | Tier | Key | Matches |
//! |------|-----|---------|
//! | 1 | `*` | always |
//! | 2 | `N` | whatever the action |
//! | 3 | `N.A` | only when the event carries action `A` |
//!
//! Events without an action only look up tiers 1 and 2. Handlers are
//! returned tier by tier, in registration order inside a tier.

use hookwise_core::{Event, WILDCARD};

use crate::registry::{HandlerRegistry, Registration};

/// Source of the handlers that apply to an event.
///
/// Implementors can decide routing from event contents or external
/// configuration. [`HandlerRegistry`] is the standard implementation.
pub trait HandlerProvider: Send + Sync + 'static {
    /// Handlers for an event with this name and action, in start order.
    fn resolve(&self, name: &str, action: Option<&str>) -> Vec<Registration>;

    /// Handlers for `event`.
    fn resolve_event(&self, event: &Event) -> Vec<Registration> {
        self.resolve(&event.name, event.action())
    }
}

impl HandlerProvider for HandlerRegistry {
    fn resolve(&self, name: &str, action: Option<&str>) -> Vec<Registration> {
        let mut matched: Vec<Registration> = Vec::new();

        matched.extend_from_slice(self.get(WILDCARD));
        // Only a bare name can key a name-tier registration.
        if name != WILDCARD && !name.contains('.') {
            matched.extend_from_slice(self.get(name));
        }
        if let Some(action) = action {
            matched.extend_from_slice(self.get(&format!("{name}.{action}")));
        }

        matched.retain(|registration| registration.pattern().matches(name, action));
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;
    use hookwise_core::{Context, EventPattern};
    use std::sync::Arc;

    async fn noop(_event: Arc<Event>, _ctx: Context) {}

    fn keys(matched: &[Registration]) -> Vec<String> {
        matched.iter().map(|r| r.pattern().key()).collect()
    }

    fn registry() -> HandlerRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .on("issues.opened", noop)
            .unwrap()
            .on("issues.closed", noop)
            .unwrap()
            .on("issues", noop)
            .unwrap()
            .on("*", noop)
            .unwrap()
            .on("push", noop)
            .unwrap();
        builder.build()
    }

    #[test]
    fn selects_all_tiers_in_order() {
        let matched = registry().resolve("issues", Some("opened"));
        assert_eq!(keys(&matched), vec!["*", "issues", "issues.opened"]);
    }

    #[test]
    fn other_actions_are_never_selected() {
        let matched = registry().resolve("issues", Some("labeled"));
        assert_eq!(keys(&matched), vec!["*", "issues"]);
    }

    #[test]
    fn event_without_action_uses_name_and_wildcard_only() {
        let matched = registry().resolve("issues", None);
        assert_eq!(keys(&matched), vec!["*", "issues"]);

        let push = registry().resolve("push", None);
        assert_eq!(keys(&push), vec!["*", "push"]);
    }

    #[test]
    fn unknown_event_only_hits_wildcard() {
        let matched = registry().resolve("deployment", Some("created"));
        assert_eq!(keys(&matched), vec!["*"]);
        assert_eq!(matched[0].pattern(), &EventPattern::Any);
    }

    #[test]
    fn dotted_event_name_never_hits_action_patterns() {
        let matched = registry().resolve("issues.opened", None);
        assert_eq!(keys(&matched), vec!["*"]);

        let with_action = registry().resolve("issues.opened", Some("closed"));
        assert_eq!(keys(&with_action), vec!["*"]);
    }

    #[test]
    fn empty_registry_matches_nothing() {
        assert!(HandlerRegistry::default().resolve("issues", Some("opened")).is_empty());
    }
}

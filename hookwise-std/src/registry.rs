//! Handler registration.
//!
//! Registration happens in two phases. While the application loads, handlers
//! are added to a [`RegistryBuilder`]. [`RegistryBuilder::build`] then freezes
//! them into a [`HandlerRegistry`], which is read-only and shared by every
//! dispatch. Handlers cannot be added once a registry is serving events.

use hookwise_core::{DynHandler, EventPattern, Handler, IntoPatterns, RegistryError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One handler subscribed to one pattern.
#[derive(Clone)]
pub struct Registration {
    pattern: EventPattern,
    handler: Arc<dyn DynHandler>,
}

impl Registration {
    /// The pattern this handler was registered under.
    pub fn pattern(&self) -> &EventPattern {
        &self.pattern
    }

    /// The handler.
    pub fn handler(&self) -> &Arc<dyn DynHandler> {
        &self.handler
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("pattern", &self.pattern.key())
            .finish_non_exhaustive()
    }
}

/// Frozen mapping from pattern string to the handlers registered under it.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    routes: HashMap<String, Vec<Registration>>,
    len: usize,
}

impl HandlerRegistry {
    /// Start a new registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Handlers registered under exactly `pattern`, in registration order.
    pub fn get(&self, pattern: &str) -> &[Registration] {
        self.routes.get(pattern).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every pattern with at least one handler.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Collects registrations during application load.
#[derive(Default)]
pub struct RegistryBuilder {
    routes: HashMap<String, Vec<Registration>>,
    len: usize,
}

impl RegistryBuilder {
    /// Create a new empty registry builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for one or more patterns.
    ///
    /// A list registers the same handler once per pattern. Repeating a
    /// pattern inside one call registers it once; separate calls are never
    /// merged, so the same pattern registered twice runs both handlers.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if any pattern is invalid or none is given.
    /// Nothing is registered in that case.
    pub fn on<P, H>(&mut self, patterns: P, handler: H) -> Result<&mut Self, RegistryError>
    where
        P: IntoPatterns,
        H: Handler,
    {
        self.on_dyn(patterns, Arc::new(handler))
    }

    /// Register an already type-erased handler.
    ///
    /// # Errors
    ///
    /// Same as [`RegistryBuilder::on`].
    pub fn on_dyn<P>(
        &mut self,
        patterns: P,
        handler: Arc<dyn DynHandler>,
    ) -> Result<&mut Self, RegistryError>
    where
        P: IntoPatterns,
    {
        let mut parsed: Vec<EventPattern> = Vec::new();
        for raw in patterns.into_patterns() {
            let pattern = EventPattern::parse(&raw)?;
            if !parsed.contains(&pattern) {
                parsed.push(pattern);
            }
        }
        if parsed.is_empty() {
            return Err(RegistryError::NoPatterns);
        }

        for pattern in parsed {
            tracing::trace!(pattern = %pattern, "registering handler");
            self.routes
                .entry(pattern.key())
                .or_default()
                .push(Registration {
                    pattern,
                    handler: Arc::clone(&handler),
                });
            self.len += 1;
        }
        Ok(self)
    }

    /// Number of registrations so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Freeze the registrations.
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            routes: self.routes,
            len: self.len,
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookwise_core::{Context, Event};

    async fn noop(_event: Arc<Event>, _ctx: Context) {}

    #[test]
    fn list_registers_once_per_pattern() {
        let mut builder = RegistryBuilder::new();
        builder.on(["issues.opened", "pull_request"], noop).unwrap();
        let registry = builder.build();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("issues.opened").len(), 1);
        assert_eq!(registry.get("pull_request").len(), 1);
        assert!(registry.get("issues").is_empty());
    }

    #[test]
    fn repeated_pattern_in_one_call_collapses() {
        let mut builder = RegistryBuilder::new();
        builder.on(vec!["issues", "issues"], noop).unwrap();
        assert_eq!(builder.build().get("issues").len(), 1);
    }

    #[test]
    fn separate_calls_are_not_merged() {
        let mut builder = RegistryBuilder::new();
        builder.on("issues", noop).unwrap().on("issues", noop).unwrap();
        assert_eq!(builder.build().get("issues").len(), 2);
    }

    #[test]
    fn invalid_pattern_registers_nothing() {
        let mut builder = RegistryBuilder::new();
        let err = builder.on(["issues", "bad."], noop).unwrap_err();
        assert_eq!(err, RegistryError::InvalidPattern("bad.".into()));
        assert!(builder.is_empty());

        let none: Vec<&str> = Vec::new();
        assert_eq!(builder.on(none, noop).unwrap_err(), RegistryError::NoPatterns);
    }
}

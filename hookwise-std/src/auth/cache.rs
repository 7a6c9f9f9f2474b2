//! In-memory cache of installation access tokens.
//!
//! Entries expire `safety_margin` before the issuer says they do, so a token
//! handed out here stays valid for at least that long. Expiry is checked
//! lazily on access; there is no background sweeper.

use hookwise_core::InstallationId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default margin subtracted from the issuer's token lifetime.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Default number of installations whose tokens are kept.
pub const DEFAULT_CAPACITY: usize = 15_000;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Installation tokens keyed by installation id.
///
/// One token per installation: inserting replaces the previous entry as a
/// whole, so readers never observe a partially written token.
#[derive(Debug)]
pub struct TokenCache {
    entries: Mutex<HashMap<InstallationId, CachedToken>>,
    safety_margin: Duration,
    capacity: usize,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    /// Create a cache with the default margin and capacity.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            safety_margin: DEFAULT_SAFETY_MARGIN,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Set the safety margin.
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    /// Set the maximum number of cached installations (at least one).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// The configured safety margin.
    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }

    /// A live token for `id`, or `None` if absent or expired.
    ///
    /// Expired entries are dropped on the way out.
    pub fn get(&self, id: InstallationId) -> Option<String> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(&id) {
            Some(cached) if now < cached.expires_at => Some(cached.token.clone()),
            Some(_) => {
                entries.remove(&id);
                None
            }
            None => None,
        }
    }

    /// Store a token the issuer says is valid for `ttl`.
    ///
    /// Returns the instant the cached entry expires, or `None` when `ttl`
    /// does not exceed the safety margin and nothing was stored.
    pub fn insert(&self, id: InstallationId, token: String, ttl: Duration) -> Option<Instant> {
        let lifetime = ttl.checked_sub(self.safety_margin)?;
        if lifetime.is_zero() {
            return None;
        }
        let now = Instant::now();
        let expires_at = now + lifetime;

        let mut entries = self.entries.lock();
        if !entries.contains_key(&id) && entries.len() >= self.capacity {
            entries.retain(|_, cached| now < cached.expires_at);
            if entries.len() >= self.capacity {
                let soonest = entries
                    .iter()
                    .min_by_key(|(_, cached)| cached.expires_at)
                    .map(|(id, _)| *id);
                if let Some(evicted) = soonest {
                    entries.remove(&evicted);
                }
            }
        }
        entries.insert(id, CachedToken { token, expires_at });
        Some(expires_at)
    }

    /// Drop the token for `id`. Returns whether one was cached.
    pub fn invalidate(&self, id: InstallationId) -> bool {
        self.entries.lock().remove(&id).is_some()
    }

    /// Number of entries, expired ones included until they are next touched.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

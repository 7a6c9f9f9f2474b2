//! Event patterns used to subscribe handlers.
//!
//! A pattern is one of:
//!
//! | Pattern | Matches |
//! |---------|---------|
//! | `*` | every event |
//! | `issues` | every `issues` event, whatever its action |
//! | `issues.opened` | `issues` events whose action is `opened` |

use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

/// The wildcard pattern.
pub const WILDCARD: &str = "*";

/// A parsed subscription pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventPattern {
    /// `*`
    Any,
    /// `name`
    Name(String),
    /// `name.action`
    NameAction {
        /// Event name.
        name: String,
        /// Required action.
        action: String,
    },
}

impl EventPattern {
    /// Parse a pattern string.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidPattern`] for empty strings, empty
    /// segments, or more than one `.`.
    pub fn parse(pattern: &str) -> Result<Self, RegistryError> {
        let invalid = || RegistryError::InvalidPattern(pattern.to_string());

        if pattern == WILDCARD {
            return Ok(EventPattern::Any);
        }
        if pattern.is_empty() || pattern.contains(char::is_whitespace) {
            return Err(invalid());
        }

        match pattern.split_once('.') {
            None if pattern.contains('*') => Err(invalid()),
            None => Ok(EventPattern::Name(pattern.to_string())),
            Some((name, action)) => {
                if name.is_empty()
                    || action.is_empty()
                    || action.contains('.')
                    || pattern.contains('*')
                {
                    return Err(invalid());
                }
                Ok(EventPattern::NameAction {
                    name: name.to_string(),
                    action: action.to_string(),
                })
            }
        }
    }

    /// `true` when this pattern applies to an event with the given name and action.
    pub fn matches(&self, event_name: &str, event_action: Option<&str>) -> bool {
        match self {
            EventPattern::Any => true,
            EventPattern::Name(name) => name == event_name,
            EventPattern::NameAction { name, action } => {
                name == event_name && event_action == Some(action.as_str())
            }
        }
    }

    /// The canonical string form, used as the lookup key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventPattern::Any => f.write_str(WILDCARD),
            EventPattern::Name(name) => f.write_str(name),
            EventPattern::NameAction { name, action } => write!(f, "{name}.{action}"),
        }
    }
}

impl FromStr for EventPattern {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Types that name one or more patterns for a registration.
///
/// Implemented for single strings and for slices, arrays and vectors of
/// strings, so `on("issues", ..)` and `on(["issues.opened", "pull_request"], ..)`
/// both work.
pub trait IntoPatterns {
    /// The raw pattern strings, in declaration order.
    fn into_patterns(self) -> Vec<String>;
}

impl IntoPatterns for &str {
    fn into_patterns(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoPatterns for String {
    fn into_patterns(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoPatterns for &String {
    fn into_patterns(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl IntoPatterns for &[&str] {
    fn into_patterns(self) -> Vec<String> {
        self.iter().map(|p| (*p).to_string()).collect()
    }
}

impl<const N: usize> IntoPatterns for [&str; N] {
    fn into_patterns(self) -> Vec<String> {
        self.iter().map(|p| (*p).to_string()).collect()
    }
}

impl IntoPatterns for Vec<&str> {
    fn into_patterns(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoPatterns for Vec<String> {
    fn into_patterns(self) -> Vec<String> {
        self
    }
}

impl IntoPatterns for &[String] {
    fn into_patterns(self) -> Vec<String> {
        self.to_vec()
    }
}

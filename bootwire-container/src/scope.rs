//! Service lifecycle scopes.
//!
//! Scopes determine how often a service is constructed:
//! - [`Scope::Singleton`]: one instance for the entire application
//! - [`Scope::Factory`]: a fresh instance per resolution

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Defines how many instances of a service the container hands out.
///
/// # Examples
/// ```
/// use bootwire_container::scope::Scope;
///
/// let scope: Scope = "factory".parse().unwrap();
/// assert_eq!(scope, Scope::Factory);
/// assert!(Scope::Singleton.is_shared());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// One instance shared across the entire application.
    ///
    /// Built once, reused by every lookup and every dependent.
    ///
    /// # When to use
    /// - Database clients and pools
    /// - Configuration objects
    /// - Shared caches
    #[default]
    Singleton,

    /// A new instance built for every resolution.
    ///
    /// Each dependent receives its own instance at its own construction
    /// time, and every `get` builds another.
    ///
    /// # When to use
    /// - Request-scoped units of work
    /// - Objects with mutable state that shouldn't be shared
    Factory,
}

impl Scope {
    /// Returns `true` if one instance is shared by everyone.
    #[inline]
    pub fn is_shared(&self) -> bool {
        matches!(self, Scope::Singleton)
    }

    /// Lowercase label used in logs and plans.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Singleton => "singleton",
            Scope::Factory => "factory",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized scope label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scope {0:?}, expected \"singleton\" or \"factory\"")]
pub struct ParseScopeError(pub String);

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "singleton" => Ok(Scope::Singleton),
            "factory" => Ok(Scope::Factory),
            other => Err(ParseScopeError(other.to_string())),
        }
    }
}

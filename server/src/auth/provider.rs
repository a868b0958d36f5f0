//! Identity provider port.

use crate::types::Identity;
use std::collections::HashMap;

/// Resolves bearer credentials to `(user id, role)` pairs
///
/// The resolution is consulted once per request; every core operation then
/// carries the resolved [`Identity`] explicitly rather than reading ambient
/// session state.
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token, or `None` when it is unknown or invalid
    fn resolve(&self, token: &str) -> Option<Identity>;
}

/// Token-table provider backed by configuration
///
/// Stands in for the out-of-scope identity service: operators seed it with
/// `token → identity` entries at startup, tests seed it directly.
#[derive(Clone, Debug, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityProvider {
    /// Creates an empty provider
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider from `(token, identity)` entries
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Identity)>) -> Self {
        Self {
            tokens: entries.into_iter().collect(),
        }
    }

    /// Registers a token
    pub fn insert(&mut self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn resolve(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).copied()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::types::{Role, UserId};

    #[test]
    fn resolves_known_tokens_only() {
        let identity = Identity::new(UserId::new(), Role::Traveler);
        let mut provider = StaticIdentityProvider::new();
        provider.insert("alice-token", identity);

        assert_eq!(provider.resolve("alice-token"), Some(identity));
        assert_eq!(provider.resolve("mallory-token"), None);
        assert_eq!(provider.resolve(""), None);
    }
}

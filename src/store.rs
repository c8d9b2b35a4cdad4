//! The ambient credential seam
//!
//! The source of truth for the current token lives outside this crate, with
//! whatever holds the session cookie. The core only depends on this
//! interface, which makes every consumer testable against a fake store.

use std::sync::{PoisonError, RwLock};

use crate::RawToken;

/// Read/write access to the ambient session credential
///
/// The core itself only ever reads through this seam; writes happen on the
/// collaborator side, typically when a refresh response replaces the cookie.
pub trait TokenStore: Send + Sync {
    /// The raw token currently in effect, if any
    fn current_token(&self) -> Option<RawToken>;

    /// Replaces the ambient token, or clears it on logout
    fn set_token(&self, token: Option<RawToken>);
}

/// An in-memory token store
///
/// Suitable for tests and for embedded deployments that have no cookie jar
/// to defer to.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    token: RwLock<Option<RawToken>>,
}

impl InMemoryTokenStore {
    /// Constructs an empty in-memory token store
    pub const fn new() -> Self {
        Self {
            token: RwLock::new(None),
        }
    }
}

impl TokenStore for InMemoryTokenStore {
    fn current_token(&self) -> Option<RawToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_token(&self, token: Option<RawToken>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExpiryPolicy, IdentityCache};
    use aliri_base64::Base64Url;
    use aliri_clock::{TestClock, UnixTime};
    use serde_json::json;

    fn token_expiring_at(exp: u64) -> RawToken {
        let payload = Base64Url::from_raw(
            serde_json::to_vec(&json!({ "user_id": "alice", "exp": exp }))
                .expect("claims serialize"),
        );
        RawToken::from(format!("aGVhZGVy.{}.c2ln", payload))
    }

    #[test]
    fn starts_empty_and_round_trips_the_token() {
        let store = InMemoryTokenStore::new();
        assert!(store.current_token().is_none());

        let token = token_expiring_at(1_700_000_000);
        store.set_token(Some(token.clone()));
        assert_eq!(store.current_token(), Some(token));

        store.set_token(None);
        assert!(store.current_token().is_none());
    }

    #[test]
    fn expiry_and_identity_read_through_the_store() {
        let now = UnixTime(1_700_000_000);
        let policy = ExpiryPolicy::default().with_clock(TestClock::new(now));
        let mut identities = IdentityCache::new();
        let store = InMemoryTokenStore::new();

        // logged out: no identity, and the absent token counts as expired
        assert!(policy.is_token_expired(store.current_token().as_deref()));
        assert!(identities
            .identity_for(store.current_token().as_deref())
            .is_none());

        store.set_token(Some(token_expiring_at(now.0 + 3600)));
        assert!(!policy.is_token_expired(store.current_token().as_deref()));
        let current = store.current_token();
        let identity = identities
            .identity_for(current.as_deref())
            .expect("identity");
        assert_eq!(identity.id().as_str(), "alice");
    }
}

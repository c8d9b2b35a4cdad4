//! Identity projection and per-token memoization

use crate::{Claims, RawToken, RawTokenRef, SubjectId, SubjectIdRef};

/// The minimal identity projection read by session-state observers
///
/// Derived from decoded claims; recomputed only when the observed raw token
/// changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    id: SubjectId,
    email: Option<String>,
}

impl Identity {
    /// Projects claims into an identity
    ///
    /// Returns `None` when the claims carry no subject (neither `user_id`
    /// nor `sub`).
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        Some(Self {
            id: claims.subject()?.to_owned(),
            email: claims.email().map(ToOwned::to_owned),
        })
    }

    /// The subject's identifier
    pub fn id(&self) -> &SubjectIdRef {
        &self.id
    }

    /// The subject's email address, if known
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Memoizes the identity decoded from the most recently observed raw token
///
/// The cache key is the exact raw token string. Supplying a different token
/// re-decodes and replaces the entry; supplying no token clears the cache so
/// no stale identity survives a logout. Entries are immutable once computed.
#[derive(Debug, Default)]
pub struct IdentityCache {
    cached: Option<(RawToken, Option<Identity>)>,
    decodes: u64,
}

impl IdentityCache {
    /// Constructs an empty identity cache
    pub const fn new() -> Self {
        Self {
            cached: None,
            decodes: 0,
        }
    }

    /// The identity carried by the supplied token, if any
    ///
    /// A decode failure is memoized as `None` for that token, so a broken
    /// token is not re-decoded on every read either.
    pub fn identity_for(&mut self, raw: Option<&RawTokenRef>) -> Option<&Identity> {
        let raw = match raw {
            Some(raw) => raw,
            None => {
                self.cached = None;
                return None;
            }
        };

        let hit = matches!(&self.cached, Some((seen, _)) if seen.as_str() == raw.as_str());
        if hit {
            tracing::trace!("identity cache hit");
        } else {
            self.decodes += 1;
            let identity = raw
                .decode()
                .and_then(|decoded| Identity::from_claims(decoded.claims()));
            self.cached = Some((raw.to_owned(), identity));
        }

        self.cached.as_ref().and_then(|(_, identity)| identity.as_ref())
    }

    #[cfg(test)]
    fn decodes(&self) -> u64 {
        self.decodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aliri_base64::Base64Url;
    use serde_json::json;

    fn token_for(subject: &str) -> RawToken {
        let payload = Base64Url::from_raw(
            serde_json::to_vec(&json!({
                "user_id": subject,
                "email": format!("{}@example.com", subject),
                "exp": 1_700_000_000u64,
            }))
            .expect("claims serialize"),
        );
        RawToken::from(format!("aGVhZGVy.{}.c2ln", payload))
    }

    #[test]
    fn identical_token_is_decoded_once() {
        let mut cache = IdentityCache::new();
        let token = token_for("alice");

        let first = cache.identity_for(Some(&token)).cloned();
        let second = cache.identity_for(Some(&token)).cloned();

        assert_eq!(first, second);
        assert_eq!(first.expect("identity").id().as_str(), "alice");
        assert_eq!(cache.decodes(), 1);
    }

    #[test]
    fn changed_token_triggers_a_fresh_decode() {
        let mut cache = IdentityCache::new();

        let alice = cache.identity_for(Some(&token_for("alice"))).cloned();
        let bob = cache.identity_for(Some(&token_for("bob"))).cloned();

        assert_ne!(alice, bob);
        assert_eq!(bob.expect("identity").id().as_str(), "bob");
        assert_eq!(cache.decodes(), 2);
    }

    #[test]
    fn absent_token_yields_none_and_clears_the_cache() {
        let mut cache = IdentityCache::new();
        let token = token_for("alice");

        assert!(cache.identity_for(Some(&token)).is_some());
        assert!(cache.identity_for(None).is_none());

        // the entry is gone, so the same token decodes again
        assert!(cache.identity_for(Some(&token)).is_some());
        assert_eq!(cache.decodes(), 2);
    }

    #[test]
    fn subjectless_token_memoizes_its_missing_identity() {
        let payload = Base64Url::from_raw(
            serde_json::to_vec(&json!({ "exp": 1_700_000_000u64 })).expect("claims serialize"),
        );
        let raw = RawToken::from(format!("head.{}.sig", payload));

        let mut cache = IdentityCache::new();
        assert!(cache.identity_for(Some(&raw)).is_none());
        assert!(cache.identity_for(Some(&raw)).is_none());
        assert_eq!(cache.decodes(), 1);
    }

    #[test]
    fn email_is_projected_alongside_the_subject() {
        let mut cache = IdentityCache::new();
        let identity = cache
            .identity_for(Some(&token_for("carol")))
            .expect("identity")
            .clone();
        assert_eq!(identity.email(), Some("carol@example.com"));
    }
}

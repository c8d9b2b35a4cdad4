//! Expiry policy over decoded claims
//!
//! The policy subtracts a skew from the token's nominal expiry so that a
//! refresh is triggered before the authority would actually start rejecting
//! the token, which keeps most calls from ever seeing an unauthenticated
//! failure in the first place.

use aliri_clock::{Clock, DurationSecs, System, UnixTime};

use crate::{Claims, RawTokenRef};

/// Policy deciding when a token should be treated as expired
///
/// A token is considered expired once `now` passes `exp - skew`. The default
/// skew is 5 minutes. A missing or undecodable token is always expired
/// (fail-closed).
#[derive(Clone, Copy, Debug)]
pub struct ExpiryPolicy<C = System> {
    skew: DurationSecs,
    clock: C,
}

impl Default for ExpiryPolicy {
    /// The default policy: a 5 minute skew against the system clock
    fn default() -> Self {
        Self {
            skew: DurationSecs(5 * 60),
            clock: System,
        }
    }
}

impl ExpiryPolicy {
    /// Constructs a policy with a custom skew, using the system clock
    pub const fn new(skew: DurationSecs) -> Self {
        Self {
            skew,
            clock: System,
        }
    }
}

impl<C> ExpiryPolicy<C> {
    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> ExpiryPolicy<D> {
        ExpiryPolicy {
            skew: self.skew,
            clock,
        }
    }

    /// The skew subtracted from the nominal expiry
    pub fn skew(&self) -> DurationSecs {
        self.skew
    }

    /// Whether the claims would be considered expired as of the provided time
    ///
    /// Monotone in `now`: once expired, a token stays expired at every later
    /// instant.
    pub fn is_expired_at(&self, claims: &Claims, now: UnixTime) -> bool {
        now + self.skew > claims.expiry()
    }
}

impl<C: Clock> ExpiryPolicy<C> {
    /// Whether the claims are considered expired right now
    pub fn is_expired(&self, claims: &Claims) -> bool {
        self.is_expired_at(claims, self.clock.now())
    }

    /// Whether the ambient token is considered expired right now
    ///
    /// An absent token, or one whose claims cannot be decoded, is treated as
    /// expired.
    pub fn is_token_expired(&self, raw: Option<&RawTokenRef>) -> bool {
        match raw.and_then(|raw| raw.decode()) {
            Some(decoded) => self.is_expired(decoded.claims()),
            None => true,
        }
    }
}

//! Best-effort decoding of bearer token claims
//!
//! A bearer token decomposes into three dot-separated segments. Only the
//! middle segment is decoded here; the header and signature are carried
//! through verbatim and nothing is cryptographically verified. Decoding is
//! deliberately total: any malformed input yields `None` rather than an
//! error, because an undecodable token is handled exactly like an absent one.

use aliri_base64::Base64Url;
use aliri_clock::UnixTime;
use serde::Deserialize;

use crate::{RawTokenRef, SubjectId, SubjectIdRef};

/// The claims carried in a bearer token's payload segment
///
/// **WARNING:** these values come from an unverified token. They are suitable
/// for client-side display and expiry scheduling, not for authorization
/// decisions; the authority re-validates the token on every call.
#[derive(Clone, Debug, Deserialize)]
pub struct Claims {
    #[serde(default)]
    user_id: Option<SubjectId>,
    #[serde(default)]
    sub: Option<SubjectId>,
    #[serde(default)]
    email: Option<String>,
    exp: UnixTime,
}

impl Claims {
    /// The authenticated subject, preferring `user_id` and falling back to
    /// the standard `sub` claim
    pub fn subject(&self) -> Option<&SubjectIdRef> {
        self.user_id.as_deref().or_else(|| self.sub.as_deref())
    }

    /// The subject's email address, if the token carries one
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// The instant at which the token expires
    pub fn expiry(&self) -> UnixTime {
        self.exp
    }
}

/// A decoded token: parsed claims plus the verbatim outer segments
///
/// The header and signature are opaque and unvalidated; they are preserved so
/// that a downstream consumer still sees the token's full three-part shape.
#[derive(Clone, Debug)]
pub struct DecodedToken {
    header: String,
    claims: Claims,
    signature: String,
}

impl DecodedToken {
    /// The encoded header segment, exactly as it appeared in the raw token
    pub fn header(&self) -> &str {
        &self.header
    }

    /// The parsed claims
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// The encoded signature segment, exactly as it appeared in the raw token
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Consumes the decoded token, keeping only the claims
    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

impl RawTokenRef {
    /// Decodes the token's claims without verifying its signature
    ///
    /// Returns `None` if the token does not have exactly three dot-separated
    /// segments, if the middle segment is not valid base64url, or if the
    /// decoded bytes do not parse as a claims record. No failure here ever
    /// escapes as an error or panic.
    pub fn decode(&self) -> Option<DecodedToken> {
        let mut segments = self.as_str().split('.');
        let (header, payload, signature) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return None,
            };

        let p_raw = Base64Url::from_encoded(payload).ok()?;
        let claims: Claims = serde_json::from_slice(p_raw.as_slice()).ok()?;

        Some(DecodedToken {
            header: header.to_owned(),
            claims,
            signature: signature.to_owned(),
        })
    }
}

//! Client-side management of a bearer-token session
//!
//! This library keeps outbound authenticated calls valid across token expiry
//! without duplicating refresh work or dropping in-flight requests. It does
//! this with three cooperating pieces:
//!
//! * a claims decoder that extracts identity and expiry from an opaque signed
//!   token _without_ verifying its signature,
//! * a single-flight refresh coordinator that guarantees at most one refresh
//!   round trip is outstanding no matter how many concurrent callers need a
//!   fresh credential, and
//! * a call interceptor that transparently repairs a rejected call by
//!   refreshing the credential and replaying the call exactly once.
//!
//! The actual transport and the refresh round trip are injected
//! collaborators. The transport only needs to expose a way to classify a
//! failure as an authentication rejection, and the refresh backend is a
//! single parameterless operation whose success means the ambient credential
//! has been replaced by a side channel (such as a cookie set on the refresh
//! response).
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokenward::{AuthFailure, CallInterceptor, RefreshBackend, RefreshCoordinator};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("call rejected: unauthenticated")]
//! struct Unauthenticated;
//!
//! impl AuthFailure for Unauthenticated {
//!     fn is_auth_failure(&self) -> bool {
//!         true
//!     }
//! }
//!
//! struct CookieRefresh;
//!
//! #[async_trait]
//! impl RefreshBackend for CookieRefresh {
//!     type Error = std::io::Error;
//!
//!     async fn perform_refresh(&self) -> Result<(), Self::Error> {
//!         // One round trip to the token authority; on success the response
//!         // has already replaced the ambient credential.
//!         Ok(())
//!     }
//! }
//!
//! async fn fetch_profile() -> Result<String, Unauthenticated> {
//!     let coordinator = Arc::new(RefreshCoordinator::new(CookieRefresh));
//!     let interceptor = CallInterceptor::new(coordinator);
//!
//!     interceptor
//!         .execute(|| async {
//!             // the outbound call through the real transport goes here
//!             Ok(String::from("profile"))
//!         })
//!         .await
//! }
//! ```
//!
//! Alongside the call path, [`ExpiryPolicy`] answers whether the current
//! token is due for a proactive refresh (a missing or undecodable token is
//! always treated as expired), and [`IdentityCache`] memoizes the decoded
//! identity so session-state observers do not re-decode the token on every
//! read.

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
mod claims;
mod expiry;
mod identity;
mod intercept;
mod refresh;
mod store;

pub use braids::*;
pub use claims::{Claims, DecodedToken};
pub use expiry::ExpiryPolicy;
pub use identity::{Identity, IdentityCache};
pub use intercept::{AuthFailure, CallInterceptor};
pub use refresh::{RefreshBackend, RefreshCoordinator, RefreshError};
pub use store::{InMemoryTokenStore, TokenStore};

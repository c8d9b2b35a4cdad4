//! Transparent repair of authentication-rejected calls
//!
//! The interceptor wraps one outbound call. On the happy path the call runs
//! once and nothing else happens. When the transport reports a failure that
//! classifies as an authentication rejection, the interceptor refreshes the
//! credential through the shared coordinator and replays the call exactly
//! once, bounding the amplification of a single logical call to one extra
//! round trip no matter how the replay turns out.

use std::error;
use std::future::Future;
use std::sync::Arc;

use crate::refresh::{RefreshBackend, RefreshCoordinator};

/// The failure classification capability exposed by the transport
///
/// Implemented by the transport's error type. Only an authentication
/// rejection (an HTTP 401/403 equivalent, or a protocol-level
/// "unauthenticated" status) should report `true`; network and server faults
/// must not, or they would trigger pointless refreshes.
pub trait AuthFailure {
    /// True when the failure means the credential was rejected
    fn is_auth_failure(&self) -> bool;
}

/// Wraps outbound calls and repairs authentication rejections
///
/// Stateless across calls apart from the shared [`RefreshCoordinator`]; each
/// [`execute`][Self::execute] invocation keeps its own retry bookkeeping, so
/// concurrent calls never interfere with one another.
#[derive(Debug)]
pub struct CallInterceptor<B> {
    coordinator: Arc<RefreshCoordinator<B>>,
    max_retries: u32,
}

impl<B> Clone for CallInterceptor<B> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            max_retries: self.max_retries,
        }
    }
}

impl<B: RefreshBackend> CallInterceptor<B> {
    /// Constructs an interceptor sharing the given coordinator
    ///
    /// The default retry budget is one replay per original call.
    pub fn new(coordinator: Arc<RefreshCoordinator<B>>) -> Self {
        Self {
            coordinator,
            max_retries: 1,
        }
    }

    /// Overrides the retry budget
    ///
    /// Every replay is preceded by a credential refresh; the budget bounds
    /// how far one logical call can amplify.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Executes a call, repairing an authentication rejection by refreshing
    /// the credential and replaying the call
    ///
    /// * a successful attempt returns immediately, no refresh involved;
    /// * a failure that does not classify as an authentication rejection
    ///   propagates unchanged;
    /// * if the refresh itself fails, the *original* call error is returned
    ///   so the caller sees the failure mode it would have seen without any
    ///   repair machinery (the refresh error is logged, not surfaced);
    /// * otherwise the call is replayed and the replay's outcome is returned
    ///   as-is, success or failure.
    pub async fn execute<T, E, F, Fut>(&self, mut attempt: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: AuthFailure,
    {
        let mut outcome = attempt().await;

        for _ in 0..self.max_retries {
            match &outcome {
                Err(error) if error.is_auth_failure() => {}
                _ => break,
            }

            tracing::debug!("call rejected as unauthenticated, refreshing credential");
            if let Err(error) = self.coordinator.refresh().await {
                tracing::warn!(
                    error = (&error as &dyn error::Error),
                    "refresh failed, returning the original call error"
                );
                break;
            }

            tracing::trace!("credential refreshed, replaying call");
            outcome = attempt().await;
        }

        outcome
    }
}

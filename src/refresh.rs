//! Single-flight coordination of credential refresh
//!
//! However many concurrent callers discover an expired or rejected
//! credential, at most one refresh round trip is outstanding at a time.
//! Later callers join the flight already in progress and observe the same
//! outcome as the caller that started it.

use async_trait::async_trait;
use std::error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;

/// The injected operation that obtains a fresh credential
///
/// One parameterless round trip to the token authority. On success the
/// ambient credential is expected to have been replaced by a side channel
/// (such as a cookie set on the response); the coordinator only cares whether
/// the round trip settled successfully.
#[async_trait]
pub trait RefreshBackend: Send + Sync {
    /// The error type returned when the refresh round trip fails
    type Error: error::Error + Send + Sync + 'static;

    /// Performs one refresh round trip against the token authority
    async fn perform_refresh(&self) -> Result<(), Self::Error>;
}

/// An error encountered while refreshing the credential
///
/// Clonable so that a single failed flight can be reported verbatim to every
/// caller that joined it.
#[derive(Clone, Debug, Error)]
pub enum RefreshError {
    /// The refresh round trip failed; the backend's error is the source
    #[error("credential refresh failed")]
    Backend(#[source] Arc<dyn error::Error + Send + Sync + 'static>),

    /// The flight was dropped before it settled
    ///
    /// Only observable by joiners whose leading caller was cancelled from
    /// the outside; the coordinator itself always runs a flight to
    /// completion.
    #[error("credential refresh abandoned before settling")]
    Abandoned,
}

/// The single pending outcome shared by every caller of one flight
type SharedOutcome = watch::Receiver<Option<Result<(), RefreshError>>>;

/// What a caller found when it checked the in-flight slot
enum FlightRole {
    /// A flight was already running; carry its shared outcome
    Joiner(SharedOutcome),
    /// No flight was running; this caller leads the new one
    Leader(watch::Sender<Option<Result<(), RefreshError>>>),
}

/// Coordinates refresh attempts so that at most one is in flight at a time
///
/// The coordinator is `Idle` until some caller invokes
/// [`refresh`][Self::refresh]; that caller becomes the leader and runs the
/// backend round trip while everyone else arriving in the meantime joins as
/// a waiter. The in-flight marker is cleared before the outcome is
/// broadcast, so a `refresh` issued right after settlement starts a
/// brand-new attempt instead of reusing a stale one. This holds on failure
/// too: the coordinator never retries by itself, it just returns to idle.
pub struct RefreshCoordinator<B> {
    backend: B,
    inflight: Mutex<Option<SharedOutcome>>,
}

impl<B: fmt::Debug> fmt::Debug for RefreshCoordinator<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl<B: RefreshBackend> RefreshCoordinator<B> {
    /// Constructs a coordinator around the injected refresh operation
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            inflight: Mutex::new(None),
        }
    }

    /// Refreshes the credential, joining any attempt already in flight
    ///
    /// Returns once the single underlying round trip settles. Every caller
    /// of the same flight observes the identical outcome; a backend failure
    /// is returned verbatim to all of them and is not retried here. Retry
    /// policy for the outer call belongs to the interceptor, not to the
    /// coordinator.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        // The lock scope must close before any await so the future stays
        // `Send`; the guard never travels past this block.
        let role = {
            let mut inflight = self.lock_inflight();
            match &*inflight {
                Some(outcome) => FlightRole::Joiner(outcome.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *inflight = Some(rx);
                    FlightRole::Leader(tx)
                }
            }
        };

        let tx = match role {
            FlightRole::Joiner(rx) => {
                tracing::trace!("joining in-flight credential refresh");
                return join(rx).await;
            }
            FlightRole::Leader(tx) => tx,
        };

        // Clears the marker when dropped, so the coordinator returns to idle
        // even if this future is dropped mid-flight.
        let idle_again = ClearInFlight {
            slot: &self.inflight,
        };

        tracing::debug!("starting credential refresh");
        let outcome = self
            .backend
            .perform_refresh()
            .await
            .map_err(|err| RefreshError::Backend(Arc::new(err)));

        // Marker must be cleared before the outcome is delivered: a caller
        // arriving after settlement gets a fresh attempt, never this one.
        drop(idle_again);

        match &outcome {
            Ok(()) => tracing::debug!("credential refresh settled"),
            Err(error) => {
                tracing::warn!(error = (error as &dyn error::Error), "credential refresh failed");
            }
        }

        if tx.send(Some(outcome.clone())).is_err() {
            tracing::trace!("no other callers joined this refresh");
        }

        outcome
    }

    fn lock_inflight(&self) -> MutexGuard<'_, Option<SharedOutcome>> {
        // The slot holds no invariant that a panicked holder could have
        // broken half-way, so a poisoned lock is still usable.
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct ClearInFlight<'a> {
    slot: &'a Mutex<Option<SharedOutcome>>,
}

impl Drop for ClearInFlight<'_> {
    fn drop(&mut self) {
        *self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

async fn join(mut rx: SharedOutcome) -> Result<(), RefreshError> {
    loop {
        if let Some(outcome) = rx.borrow_and_update().clone() {
            return outcome;
        }
        if rx.changed().await.is_err() {
            // The leader was dropped without settling.
            return Err(RefreshError::Abandoned);
        }
    }
}

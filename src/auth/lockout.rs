//! Consecutive failure tracking per client.

use std::sync::Arc;

use crate::error::GateError;
use crate::gate::{endpoints, Rejection, RedirectSignal};
use crate::session::{ClientIdentity, SessionStore};

/// Failures after which a client is sent to the error surface.
pub const LOCKOUT_THRESHOLD: u32 = 3;

/// Counts failed verifications and escalates to a redirect.
///
/// This only steers the UI; it does not block further attempts.
#[derive(Clone)]
pub struct LockoutTracker {
    store: Arc<dyn SessionStore>,
    threshold: u32,
}

impl LockoutTracker {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            threshold: LOCKOUT_THRESHOLD,
        }
    }

    /// Count a failure for `client` and decide how to reject it.
    ///
    /// The counter is updated before anything is returned.
    pub fn record_failure(&self, client: &ClientIdentity, reason: GateError) -> Rejection {
        let failures = self.store.record_failure(client);

        if failures >= self.threshold {
            tracing::warn!(
                client = %client,
                failures,
                reason = %reason,
                "Too many failed attempts, redirecting to error page"
            );
            return Rejection::Redirect(RedirectSignal::to(endpoints::ERROR));
        }

        tracing::error!(
            client = %client,
            failures,
            reason = %reason,
            "Incorrect username or password"
        );
        Rejection::Error(reason)
    }

    /// Clear the failure count for `client`.
    pub fn reset(&self, client: &ClientIdentity) {
        self.store.reset_failures(client);
    }

    pub fn failures(&self, client: &ClientIdentity) -> u32 {
        self.store.failures(client)
    }
}

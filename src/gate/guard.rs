//! Session guard: the precondition for every protected request.

use std::sync::Arc;

use subtle::ConstantTimeEq;

use crate::gate::{endpoints, RedirectSignal};
use crate::session::{ClientIdentity, SessionRecord, SessionStore};

/// Shown on the session surface when a presented token is rejected.
pub const SESSION_INVALID_DETAIL: &str = "Session expired or invalid. Please log in again.";

/// Result of a session check.
#[derive(Debug)]
pub enum Outcome {
    /// The request may proceed; carries the matching session.
    Allow(SessionRecord),
    /// The request must go elsewhere.
    Redirect(RedirectSignal),
}

/// Checks presented session tokens against the session store.
#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<dyn SessionStore>,
}

impl SessionGuard {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Decide whether `client` presenting `token` may access `source`.
    ///
    /// No token at all sends the client to the login surface; a token that
    /// does not match the stored one sends it to the session surface. Both
    /// are denials; the split only changes what the UI says.
    pub fn check(&self, client: &ClientIdentity, token: Option<&str>, source: &str) -> Outcome {
        let token = token.filter(|t| !t.is_empty());
        let stored = self.store.get(client);

        if let (Some(record), Some(token)) = (stored.as_ref(), token) {
            if bool::from(record.token.as_bytes().ct_eq(token.as_bytes())) {
                tracing::debug!(client = %client, path = %source, "Session is valid");
                return Outcome::Allow(record.clone());
            }
        }

        match token {
            None => {
                tracing::warn!(client = %client, path = %source, "No session token presented");
                Outcome::Redirect(RedirectSignal::to(endpoints::LOGIN).with_source(source))
            }
            Some(_) => {
                tracing::warn!(
                    client = %client,
                    path = %source,
                    stored = stored.is_some(),
                    "Session token mismatch"
                );
                Outcome::Redirect(
                    RedirectSignal::to(endpoints::SESSION)
                        .with_source(source)
                        .with_detail(SESSION_INVALID_DETAIL),
                )
            }
        }
    }
}

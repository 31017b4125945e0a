//! Signed credential verification and session issuance.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use subtle::ConstantTimeEq;

use crate::auth::{expected_signature, Credential, LockoutTracker};
use crate::error::GateError;
use crate::gate::Rejection;
use crate::session::{ClientIdentity, SessionRecord, SessionStore};

/// Bytes of randomness in a session token.
const TOKEN_BYTES: usize = 64;

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Generate a URL-safe session token from the OS RNG.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validates bearer credentials against the configured user.
#[derive(Clone)]
pub struct Verifier {
    username: String,
    password: String,
    store: Arc<dyn SessionStore>,
    lockout: LockoutTracker,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let lockout = LockoutTracker::new(store.clone());
        Self {
            username: username.into(),
            password: password.into(),
            store,
            lockout,
        }
    }

    /// Verify `raw` for `client` and issue a session.
    pub fn verify(
        &self,
        raw: Option<&str>,
        client: &ClientIdentity,
    ) -> Result<SessionRecord, Rejection> {
        self.authenticate(raw, client)?;
        Ok(self.issue(client))
    }

    /// Check `raw` without touching the client's session.
    ///
    /// Every failure is counted before it is returned; the third consecutive
    /// failure becomes a redirect to the error surface.
    pub fn authenticate(&self, raw: Option<&str>, client: &ClientIdentity) -> Result<(), Rejection> {
        self.check(raw)
            .map_err(|reason| self.lockout.record_failure(client, reason))
    }

    /// Issue a fresh session for an authenticated `client`, replacing any
    /// previous one and clearing its failure count.
    pub fn issue(&self, client: &ClientIdentity) -> SessionRecord {
        self.lockout.reset(client);

        let record = SessionRecord {
            token: generate_token(),
            subject: self.username.clone(),
            issued_at: Utc::now(),
            generation: self.store.next_generation(),
        };
        self.store.put(client.clone(), record.clone());

        tracing::info!(
            client = %client,
            subject = %record.subject,
            generation = record.generation,
            "Session issued"
        );
        record
    }

    fn check(&self, raw: Option<&str>) -> Result<(), GateError> {
        let raw = raw
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(GateError::MissingCredential)?;

        let credential = Credential::decode(raw)?;

        if !constant_time_eq(&credential.subject, &self.username) {
            tracing::warn!(subject = %credential.subject, "User not allowed");
            return Err(GateError::CredentialMismatch);
        }

        let expected = expected_signature(&self.username, &self.password, &credential.timestamp);
        if !constant_time_eq(&credential.signature, &expected) {
            return Err(GateError::CredentialMismatch);
        }

        Ok(())
    }
}

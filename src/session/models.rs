//! Session domain types.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Key that scopes a session, usually the remote address.
///
/// Clients behind a shared NAT or proxy collapse onto one identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IpAddr> for ClientIdentity {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An issued session for one client identity.
#[derive(Clone, Serialize)]
pub struct SessionRecord {
    /// Opaque random token carried in the `session_token` cookie.
    #[serde(skip_serializing)]
    pub token: String,
    /// Authenticated username.
    pub subject: String,
    /// When the session was issued.
    pub issued_at: DateTime<Utc>,
    /// Store-wide monotonically increasing id, used to scope teardown.
    pub generation: u64,
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("subject", &self.subject)
            .field("issued_at", &self.issued_at)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

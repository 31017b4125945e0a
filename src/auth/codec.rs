//! Credential codec.
//!
//! A bearer credential is `base64(hex("username,signature,timestamp"))`,
//! where `signature = sha512_hex(hex(username) + hex(password) + timestamp)`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha512};
use thiserror::Error;

/// Failure to decode a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid base64 payload")]
    Base64,
    #[error("invalid hex payload")]
    Hex,
    #[error("payload is not valid UTF-8")]
    Utf8,
    #[error("expected 3 comma-separated fields, found {0}")]
    FieldCount(usize),
}

/// Decode a standard base64 string into UTF-8 text.
pub fn base64_decode(value: &str) -> Result<String, CodecError> {
    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|_| CodecError::Base64)?;
    String::from_utf8(bytes).map_err(|_| CodecError::Utf8)
}

/// Encode UTF-8 text as standard base64.
pub fn base64_encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Hex-encode the UTF-8 bytes of `value` (lower case).
pub fn hex_encode(value: &str) -> String {
    hex::encode(value.as_bytes())
}

/// Decode a hex string back into UTF-8 text.
pub fn hex_decode(value: &str) -> Result<String, CodecError> {
    let bytes = hex::decode(value.trim()).map_err(|_| CodecError::Hex)?;
    String::from_utf8(bytes).map_err(|_| CodecError::Utf8)
}

/// SHA-512 digest of `message`, lower-case hex.
pub fn calculate_hash(message: &str) -> String {
    hex::encode(Sha512::digest(message.as_bytes()))
}

/// Signature a client must present for the given credentials and timestamp.
pub fn expected_signature(username: &str, password: &str, timestamp: &str) -> String {
    let message = format!(
        "{}{}{}",
        hex_encode(username),
        hex_encode(password),
        timestamp
    );
    calculate_hash(&message)
}

/// A decoded bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Claimed username.
    pub subject: String,
    /// Hex digest binding username, password and timestamp.
    pub signature: String,
    /// Client-chosen timestamp, opaque to the server.
    pub timestamp: String,
}

impl Credential {
    /// Decode a raw bearer credential.
    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        let hexed = base64_decode(raw)?;
        let triple = hex_decode(&hexed)?;

        let fields: Vec<&str> = triple.split(',').collect();
        match fields.as_slice() {
            [subject, signature, timestamp] => Ok(Self {
                subject: (*subject).to_string(),
                signature: (*signature).to_string(),
                timestamp: (*timestamp).to_string(),
            }),
            other => Err(CodecError::FieldCount(other.len())),
        }
    }

    /// Build a signed credential the way the login page does.
    pub fn sign(username: &str, password: &str, timestamp: &str) -> Self {
        Self {
            subject: username.to_string(),
            signature: expected_signature(username, password, timestamp),
            timestamp: timestamp.to_string(),
        }
    }

    /// Encode into the bearer form accepted by [`Credential::decode`].
    pub fn encode(&self) -> String {
        let triple = format!("{},{},{}", self.subject, self.signature, self.timestamp);
        base64_encode(&hex_encode(&triple))
    }
}

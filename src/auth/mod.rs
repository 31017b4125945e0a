//! Authentication module for Session Gate.
//!
//! Decodes signed bearer credentials, verifies them against the configured
//! user and tracks consecutive failures per client.

mod codec;
mod lockout;
mod verifier;

pub use codec::*;
pub use lockout::*;
pub use verifier::*;

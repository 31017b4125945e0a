//! Session Gate - drop-in login gate for axum applications.
//!
//! Protected routes require a session cookie issued after the browser posts
//! a signed credential to `/verify-login`. Sessions are bound to the client
//! address and torn down after a fixed timeout.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod session;

pub use api::{ApiDoc, Authenticator};
pub use config::AuthConfig;
pub use error::{GateError, GateResult};

use crate::auth::Verifier;
use crate::gate::SessionGuard;
use crate::session::{ExpiryManager, RouteTable};

/// Application state shared across handlers and the gate middleware.
#[derive(Clone)]
pub struct AppState {
    /// Validates signed credentials and issues sessions.
    pub verifier: Verifier,
    /// Checks session cookies against the store.
    pub guard: SessionGuard,
    /// Schedules session teardown.
    pub expiry: ExpiryManager,
    /// Live/expired state of each protected path.
    pub routes: Arc<dyn RouteTable>,
    pub config: Arc<AuthConfig>,
}

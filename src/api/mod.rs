//! HTTP API layer for Session Gate.
//!
//! Serves the login, logout, session and error surfaces plus the
//! credential verification endpoint.

pub mod handlers;
mod pages;
mod routes;

pub use routes::*;

//! Session state: issued sessions, failure counters, route bindings and
//! their timed teardown.

mod expiry;
mod models;
mod routes;
mod store;

pub use expiry::*;
pub use models::*;
pub use routes::*;
pub use store::*;

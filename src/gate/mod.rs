//! The session gate: guard, redirect signals and the axum middleware that
//! puts them in front of protected routes.

mod guard;
mod middleware;
mod redirect;

pub use guard::*;
pub use middleware::*;
pub use redirect::*;

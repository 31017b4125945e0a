//! Protected route bindings.
//!
//! The router keeps its handlers; this table records whether each protected
//! path is currently wired to its real handler or to the session-expired
//! surface. The gate middleware consults it on every request.

use std::collections::HashMap;

use axum::http::Method;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::SecureRoute;

/// HTTP methods a protected route can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl HttpMethod {
    pub fn matches(&self, method: &Method) -> bool {
        let expected = match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Options => Method::OPTIONS,
        };
        expected == *method
    }
}

/// Which handler a protected path is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// The real handler, behind the session guard.
    Live,
    /// The session-expired surface.
    Expired,
}

/// Runtime state of one protected path.
#[derive(Debug, Clone)]
pub struct ProtectedRouteBinding {
    pub path: String,
    pub methods: Vec<HttpMethod>,
    pub binding: Binding,
}

impl ProtectedRouteBinding {
    /// Whether `method` is configured for this route.
    ///
    /// HEAD is accepted wherever GET is.
    pub fn permits(&self, method: &Method) -> bool {
        let method = if *method == Method::HEAD {
            &Method::GET
        } else {
            method
        };
        self.methods.iter().any(|m| m.matches(method))
    }
}

/// Capability to swap the handler bound to a protected path.
pub trait RouteTable: Send + Sync {
    /// Wire `path` to its real handler. Returns whether the binding changed.
    fn bind(&self, path: &str) -> bool;

    /// Wire `path` to the session-expired surface. Returns whether the
    /// binding changed.
    fn unbind(&self, path: &str) -> bool;

    /// Current state of `path`, if it is a protected path.
    fn route(&self, path: &str) -> Option<ProtectedRouteBinding>;
}

/// In-memory [`RouteTable`].
pub struct MemoryRouteTable {
    routes: RwLock<HashMap<String, ProtectedRouteBinding>>,
}

impl MemoryRouteTable {
    /// Build a table with every configured route live.
    pub fn new(routes: &[SecureRoute]) -> Self {
        let routes = routes
            .iter()
            .map(|route| {
                (
                    route.path.clone(),
                    ProtectedRouteBinding {
                        path: route.path.clone(),
                        methods: route.methods.clone(),
                        binding: Binding::Live,
                    },
                )
            })
            .collect();

        Self {
            routes: RwLock::new(routes),
        }
    }

    fn set(&self, path: &str, binding: Binding) -> bool {
        let mut routes = self.routes.write();
        match routes.get_mut(path) {
            Some(route) if route.binding != binding => {
                route.binding = binding;
                true
            }
            _ => false,
        }
    }
}

impl RouteTable for MemoryRouteTable {
    fn bind(&self, path: &str) -> bool {
        let changed = self.set(path, Binding::Live);
        if changed {
            tracing::debug!(path = %path, "Protected route bound to handler");
        }
        changed
    }

    fn unbind(&self, path: &str) -> bool {
        let changed = self.set(path, Binding::Expired);
        if changed {
            tracing::info!(path = %path, "Protected route swapped for session surface");
        }
        changed
    }

    fn route(&self, path: &str) -> Option<ProtectedRouteBinding> {
        self.routes.read().get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MemoryRouteTable {
        MemoryRouteTable::new(&[SecureRoute {
            path: "/secure".to_string(),
            methods: vec![HttpMethod::Get, HttpMethod::Post],
        }])
    }

    #[test]
    fn test_routes_start_live() {
        let table = table();
        assert_eq!(table.route("/secure").unwrap().binding, Binding::Live);
        assert!(table.route("/other").is_none());
    }

    #[test]
    fn test_toggle_is_two_state() {
        let table = table();

        assert!(table.unbind("/secure"));
        assert!(!table.unbind("/secure"));
        assert_eq!(table.route("/secure").unwrap().binding, Binding::Expired);

        assert!(table.bind("/secure"));
        assert!(!table.bind("/secure"));
        assert_eq!(table.route("/secure").unwrap().binding, Binding::Live);
    }

    #[test]
    fn test_unknown_paths_are_ignored() {
        let table = table();
        assert!(!table.bind("/nowhere"));
        assert!(!table.unbind("/nowhere"));
    }

    #[test]
    fn test_method_permits() {
        let route = table().route("/secure").unwrap();
        assert!(route.permits(&Method::GET));
        assert!(route.permits(&Method::HEAD));
        assert!(route.permits(&Method::POST));
        assert!(!route.permits(&Method::DELETE));
    }

    #[test]
    fn test_method_deserializes_upper_case() {
        let methods: Vec<HttpMethod> = serde_json::from_str(r#"["GET", "PATCH"]"#).unwrap();
        assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Patch]);
    }
}

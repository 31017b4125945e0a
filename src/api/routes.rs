//! Route definitions for the authentication surfaces.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers;
use crate::auth::Verifier;
use crate::config::AuthConfig;
use crate::error::GateResult;
use crate::gate::{endpoints, require_session, SessionGuard};
use crate::session::{ExpiryManager, MemoryRouteTable, MemorySessionStore, RouteTable, SessionStore};
use crate::AppState;

/// Security scheme modifier for OpenAPI.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("base64(hex(username,signature,timestamp))")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_page,
        handlers::session_page,
        handlers::error_page,
        handlers::logout,
        handlers::verify_login,
    ),
    components(schemas(
        crate::gate::RedirectBody,
        crate::error::ErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, logout and session surfaces")
    ),
    info(
        title = "Session Gate API",
        version = "0.1.0",
        description = "Signed credential login with time-boxed cookie sessions",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Puts a session gate in front of an axum application.
#[derive(Clone)]
pub struct Authenticator {
    state: AppState,
}

impl Authenticator {
    /// Validate `config` and build a gate backed by in-memory state.
    pub fn new(config: AuthConfig) -> GateResult<Self> {
        let config = config.validate()?;
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let routes: Arc<dyn RouteTable> = Arc::new(MemoryRouteTable::new(&config.routes));
        Ok(Self::with_parts(config, store, routes))
    }

    /// Build a gate over caller-supplied storage. `config` must already be
    /// validated.
    pub fn with_parts(
        config: AuthConfig,
        store: Arc<dyn SessionStore>,
        routes: Arc<dyn RouteTable>,
    ) -> Self {
        tracing::info!(
            username = %config.username,
            routes = config.routes.len(),
            timeout_secs = config.timeout_secs,
            "Session gate configured"
        );

        let state = AppState {
            verifier: Verifier::new(&config.username, &config.password, store.clone()),
            guard: SessionGuard::new(store.clone()),
            expiry: ExpiryManager::new(store, routes.clone()),
            routes,
            config: Arc::new(config),
        };
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Require a valid session on every route of `router`.
    ///
    /// Paths are matched as seen by the middleware, so merge the result
    /// rather than nesting it under a prefix.
    pub fn protect(&self, router: Router) -> Router {
        router.route_layer(middleware::from_fn_with_state(
            self.state.clone(),
            require_session,
        ))
    }

    /// The login, logout, session, error and verification endpoints.
    pub fn routes(&self) -> Router {
        build_router(self.state.clone())
    }
}

/// Build the router for the authentication surfaces.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::LOGIN, get(handlers::login_page))
        .route(endpoints::LOGOUT, get(handlers::logout))
        .route(endpoints::ERROR, get(handlers::error_page))
        .route(endpoints::SESSION, get(handlers::session_page))
        .route(endpoints::VERIFY_LOGIN, post(handlers::verify_login))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{header, Request, StatusCode},
        response::Response,
        Extension,
    };
    use tokio_test::assert_ok;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::Credential;
    use crate::config::{FallbackConfig, SecureRoute};
    use crate::session::{ClientIdentity, HttpMethod, SessionRecord};

    const PEER: &str = "127.0.0.1:40000";

    fn auth_config() -> AuthConfig {
        AuthConfig {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            timeout_secs: 2,
            routes: vec![
                SecureRoute {
                    path: "/secure".to_string(),
                    methods: vec![HttpMethod::Get],
                },
                SecureRoute {
                    path: "/reports".to_string(),
                    methods: vec![HttpMethod::Get],
                },
            ],
            fallback: FallbackConfig::default(),
            trust_forwarded_for: false,
        }
    }

    fn app() -> Router {
        app_with_store().0
    }

    fn app_with_store() -> (Router, Arc<MemorySessionStore>) {
        crate::logging::init_test();
        let config = auth_config().validate().unwrap();
        let store = Arc::new(MemorySessionStore::new());
        let routes = Arc::new(MemoryRouteTable::new(&config.routes));
        let gate = Authenticator::with_parts(config, store.clone(), routes);
        let protected = Router::new()
            .route(
                "/secure",
                get(|Extension(session): Extension<SessionRecord>| async move {
                    format!("secret for {}", session.subject)
                })
                .post(|| async { "posted" }),
            )
            .route("/reports", get(|| async { "reports" }));

        let app = Router::new()
            .merge(gate.protect(protected))
            .merge(gate.routes());
        (app, store)
    }

    fn request(method: &str, uri: &str, cookies: &[String]) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies.join("; "));
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(PEER.parse::<SocketAddr>().unwrap()));
        request
    }

    fn verify_request(credential: &str, cookies: &[String]) -> Request<Body> {
        let mut request = request("POST", endpoints::VERIFY_LOGIN, cookies);
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {credential}").parse().unwrap(),
        );
        request
    }

    /// `name=value` pairs from every non-removal Set-Cookie header.
    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .filter(|v| !v.contains("Max-Age=0"))
            .map(|v| v.split(';').next().unwrap_or_default().to_string())
            .collect()
    }

    fn cookie_header(response: &Response, name: &str) -> Option<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .find(|v| v.starts_with(&format!("{name}=")))
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    async fn body_text(response: Response) -> String {
        let bytes = assert_ok!(to_bytes(response.into_body(), usize::MAX).await);
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    fn signed(password: &str) -> String {
        Credential::sign("admin", password, "1700000000").encode()
    }

    /// Visit `path` anonymously, then log in; returns the session cookie.
    async fn login(app: &Router, path: &str) -> String {
        let response = app.clone().oneshot(request("GET", path, &[])).await.unwrap();
        let origin = set_cookies(&response);

        let response = app
            .clone()
            .oneshot(verify_request(&signed("hunter2"), &origin))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = set_cookies(&response)
            .into_iter()
            .find(|c| c.starts_with("session_token="))
            .unwrap();
        assert_eq!(body_json(response).await["redirect_url"], path);
        cookie
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_then_timeout() {
        let app = app();

        // Anonymous visit redirects to login and remembers the origin
        let response = app.clone().oneshot(request("GET", "/secure", &[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), endpoints::LOGIN);
        let origin = set_cookies(&response);
        assert!(origin.iter().any(|c| c.starts_with("X-Requested-By=")));

        // Verification returns the origin and issues the session cookie
        let response = app
            .clone()
            .oneshot(verify_request(&signed("hunter2"), &origin))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let session = cookie_header(&response, "session_token").unwrap();
        assert!(session.contains("Max-Age=2"));
        assert!(session.contains("HttpOnly"));
        let cookies = set_cookies(&response);
        assert_eq!(body_json(response).await["redirect_url"], "/secure");

        let response = app.clone().oneshot(request("GET", "/secure", &cookies)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "secret for admin");

        tokio::time::sleep(Duration::from_secs(3)).await;

        let response = app.clone().oneshot(request("GET", "/secure", &cookies)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), endpoints::SESSION);
    }

    #[tokio::test]
    async fn test_lockout_after_three_failures() {
        let app = app();
        let bad = signed("wrong");

        for _ in 0..2 {
            let response = app.clone().oneshot(verify_request(&bad, &[])).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body = body_json(response).await;
            assert_eq!(body["error"], "Incorrect username or password");
        }

        let response = app.clone().oneshot(verify_request(&bad, &[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["redirect_url"], endpoints::ERROR);
    }

    #[tokio::test]
    async fn test_verify_without_origin() {
        let app = app();
        let response = app
            .clone()
            .oneshot(verify_request(&signed("hunter2"), &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::EXPECTATION_FAILED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_without_origin_keeps_prior_session() {
        let (app, store) = app_with_store();
        let cookies = vec![login(&app, "/secure").await];
        let client = ClientIdentity::new("127.0.0.1");
        let generation = store.get(&client).unwrap().generation;

        let response = app
            .clone()
            .oneshot(verify_request(&signed("hunter2"), &[]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::EXPECTATION_FAILED);
        assert!(cookie_header(&response, "session_token").is_none());
        assert_eq!(store.get(&client).unwrap().generation, generation);

        let response = app.clone().oneshot(request("GET", "/secure", &cookies)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // The original timer still owns the session
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(store.is_empty());
        let response = app.clone().oneshot(request("GET", "/secure", &cookies)).await.unwrap();
        assert_eq!(location(&response), endpoints::SESSION);
    }

    #[tokio::test]
    async fn test_wrong_token_redirects_to_session() {
        let app = app();
        let _ = login(&app, "/secure").await;

        let forged = vec!["session_token=forged".to_string()];
        let response = app.clone().oneshot(request("GET", "/secure", &forged)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), endpoints::SESSION);
        assert!(cookie_header(&response, "detail").is_some());
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = app();
        let cookie = login(&app, "/secure").await;
        let cookies = vec![cookie];

        let response = app.clone().oneshot(request("GET", endpoints::LOGOUT, &cookies)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-cache, no-store, must-revalidate"
        );
        assert!(body_text(response).await.contains("Logged out"));

        let response = app.clone().oneshot(request("GET", "/secure", &cookies)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), endpoints::SESSION);

        // A second logout lands on the session page
        let response = app.clone().oneshot(request("GET", endpoints::LOGOUT, &cookies)).await.unwrap();
        assert!(body_text(response).await.contains("Session expired or invalid."));
    }

    #[tokio::test]
    async fn test_session_covers_other_routes() {
        let app = app();
        let cookies = vec![login(&app, "/secure").await];

        let response = app.clone().oneshot(request("GET", "/reports", &cookies)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unconfigured_method_rejected() {
        let app = app();
        let cookies = vec![login(&app, "/secure").await];

        let response = app.clone().oneshot(request("POST", "/secure", &cookies)).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_missing_connect_info() {
        let app = app();
        let request = Request::builder().uri("/secure").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_page_keeps_origin_cookie() {
        let app = app();
        let cookies = vec![
            "X-Requested-By=/secure".to_string(),
            "stale=1".to_string(),
        ];
        let response = app.clone().oneshot(request("GET", endpoints::LOGIN, &cookies)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(cookie_header(&response, "stale").is_some());
        assert!(cookie_header(&response, "X-Requested-By").is_none());
        assert!(body_text(response).await.contains("/verify-login"));
    }

    #[test]
    fn test_openapi_lists_surfaces() {
        let doc = ApiDoc::openapi();
        for path in [
            endpoints::LOGIN,
            endpoints::LOGOUT,
            endpoints::ERROR,
            endpoints::SESSION,
            endpoints::VERIFY_LOGIN,
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}

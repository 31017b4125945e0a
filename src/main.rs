//! Session Gate demo server.
//!
//! Protects a couple of sample routes behind the login gate and serves the
//! OpenAPI docs for the authentication surfaces.

use std::net::SocketAddr;

use axum::{
    response::Html,
    routing::get,
    Extension, Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use session_gate::config::Config;
use session_gate::session::SessionRecord;
use session_gate::{logging, ApiDoc, Authenticator};

async fn index(Extension(session): Extension<SessionRecord>) -> Html<String> {
    Html(format!(
        "<h1>Welcome, {}</h1><p><a href=\"/sensitive-data\">Sensitive data</a> | <a href=\"/logout\">Log out</a></p>",
        session.subject
    ))
}

async fn sensitive_data(Extension(session): Extension<SessionRecord>) -> String {
    format!(
        "Session for {} issued at {}",
        session.subject,
        session.issued_at.to_rfc3339()
    )
}

async fn hello() -> &'static str {
    "Hello from an unprotected route"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    logging::init();

    tracing::info!("Starting Session Gate v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        "Configuration loaded"
    );

    let gate = Authenticator::new(config.auth).map_err(|e| {
        tracing::error!(error = %e, "Invalid authentication settings");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    let protected = Router::new()
        .route("/", get(index))
        .route("/sensitive-data", get(sensitive_data).post(sensitive_data));

    let app = Router::new()
        .merge(gate.protect(protected))
        .merge(gate.routes())
        .route("/hello", get(hello))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

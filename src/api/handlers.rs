//! HTTP request handlers for the authentication surfaces.

use std::time::Duration;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    response::{Html, IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::api::pages;
use crate::error::{ErrorResponse, GateError};
use crate::gate::{
    deauthorize, endpoints, remove_cookie, session_cookie, Outcome, RedirectBody,
    DEAUTHORIZED_HEADERS, DETAIL_COOKIE, ORIGIN_COOKIE, SESSION_COOKIE,
};
use crate::session::ClientIdentity;
use crate::AppState;

const DEFAULT_SESSION_REASON: &str = "Session expired or invalid.";

/// Extract the credential from an `Authorization: Bearer <credential>` header.
fn bearer_credential(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, credential) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then_some(credential.trim())
}

/// Only same-site absolute paths are followed after login.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

/// Render the login page.
///
/// GET /login
#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "Login page", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn login_page(jar: CookieJar) -> impl IntoResponse {
    (
        deauthorize(jar, &[ORIGIN_COOKIE]),
        DEAUTHORIZED_HEADERS,
        Html(pages::login(endpoints::VERIFY_LOGIN)),
    )
}

/// Render the session expired page.
///
/// GET /session
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Session expired or invalid", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn session_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    session_response(&state, jar)
}

fn session_response(state: &AppState, jar: CookieJar) -> Response {
    let reason = jar
        .get(DETAIL_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_REASON.to_string());

    let fallback = &state.config.fallback;
    let html = pages::session(&reason, endpoints::LOGIN, &fallback.path, &fallback.button);

    (
        deauthorize(jar, &[ORIGIN_COOKIE]),
        DEAUTHORIZED_HEADERS,
        Html(html),
    )
        .into_response()
}

/// Render the access denied page shown after repeated failures.
///
/// GET /error
#[utoipa::path(
    get,
    path = "/error",
    responses(
        (status = 200, description = "Access denied", body = String, content_type = "text/html")
    ),
    tag = "auth"
)]
pub async fn error_page(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let fallback = &state.config.fallback;
    let html = pages::unauthorized(endpoints::LOGIN, &fallback.path, &fallback.button);

    (
        deauthorize(jar, &[ORIGIN_COOKIE]),
        DEAUTHORIZED_HEADERS,
        Html(html),
    )
}

/// End the current session.
///
/// GET /logout
#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out, or session page if no valid session", body = String, content_type = "text/html"),
        (status = 400, description = "Client could not be identified", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    client: ClientIdentity,
    jar: CookieJar,
) -> Response {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    match state.guard.check(&client, token.as_deref(), endpoints::LOGOUT) {
        Outcome::Allow(record) => {
            state.expiry.expire_now(&client);
            tracing::info!(client = %client, subject = %record.subject, "User logged out");
            (
                deauthorize(jar, &[]),
                DEAUTHORIZED_HEADERS,
                Html(pages::logout(endpoints::LOGIN)),
            )
                .into_response()
        }
        Outcome::Redirect(_) => {
            tracing::warn!(client = %client, "Invalid session");
            session_response(&state, jar)
        }
    }
}

/// Verify a signed credential and start a session.
///
/// POST /verify-login
#[utoipa::path(
    post,
    path = "/verify-login",
    responses(
        (status = 200, description = "Session issued, or lockout redirect", body = RedirectBody),
        (status = 401, description = "Incorrect username or password", body = ErrorResponse),
        (status = 417, description = "No originating path to return to", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn verify_login(
    State(state): State<AppState>,
    client: ClientIdentity,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = state.verifier.authenticate(bearer_credential(&headers), &client) {
        return rejection.into_response_for(endpoints::VERIFY_LOGIN, jar);
    }

    // The session is only issued once there is somewhere to send the client
    let destination = jar
        .get(ORIGIN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|d| is_local_path(d));
    let Some(destination) = destination else {
        tracing::warn!(client = %client, "No originating path for verified client");
        return GateError::MissingOrigin.into_response();
    };

    let record = state.verifier.issue(&client);
    let timeout_secs = state.config.timeout_secs;
    state.expiry.schedule(
        client,
        &destination,
        record.generation,
        Duration::from_secs(timeout_secs),
    );

    let jar = remove_cookie(jar, ORIGIN_COOKIE).add(session_cookie(record.token, timeout_secs));
    (
        jar,
        Json(RedirectBody {
            redirect_url: destination,
        }),
    )
        .into_response()
}

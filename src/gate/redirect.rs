//! Redirect signals and their translation into responses.

use axum::{
    http::{header, HeaderName},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::GateError;

/// Paths of the authentication surfaces.
pub mod endpoints {
    pub const LOGIN: &str = "/login";
    pub const LOGOUT: &str = "/logout";
    pub const ERROR: &str = "/error";
    pub const SESSION: &str = "/session";
    pub const VERIFY_LOGIN: &str = "/verify-login";
}

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session_token";
/// Cookie carrying a human-readable redirect reason. Display only.
pub const DETAIL_COOKIE: &str = "detail";
/// Cookie carrying the path a redirect originated from.
pub const ORIGIN_COOKIE: &str = "X-Requested-By";

/// Lifetime of the `detail` and origin cookies.
const REDIRECT_COOKIE_MAX_AGE_SECS: i64 = 600;

/// A structured "go elsewhere" decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSignal {
    /// Where the client should go.
    pub destination: String,
    /// Path the signal originated from, to return to after login.
    pub source: Option<String>,
    /// Reason shown on the destination page.
    pub detail: Option<String>,
}

impl RedirectSignal {
    pub fn to(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            source: None,
            detail: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Typed denial: either a redirect or an error response.
#[derive(Debug)]
pub enum Rejection {
    Redirect(RedirectSignal),
    Error(GateError),
}

impl Rejection {
    /// Turn the rejection into a response for a request to `raised_at`.
    pub fn into_response_for(self, raised_at: &str, jar: CookieJar) -> Response {
        match self {
            Rejection::Redirect(signal) => translate(signal, raised_at, jar),
            Rejection::Error(error) => error.into_response(),
        }
    }
}

/// Body returned to programmatic callers instead of a 3xx.
#[derive(Debug, Serialize, ToSchema)]
pub struct RedirectBody {
    /// Where the client should navigate next.
    pub redirect_url: String,
}

/// Translate a redirect signal raised while handling `raised_at`.
///
/// The verification endpoint is called from script, so it gets a JSON body;
/// everything else gets a browser redirect.
pub fn translate(signal: RedirectSignal, raised_at: &str, mut jar: CookieJar) -> Response {
    tracing::debug!(
        destination = %signal.destination,
        source = ?signal.source,
        raised_at = %raised_at,
        "Redirecting client"
    );

    if let Some(detail) = signal.detail.as_deref().filter(|d| !d.is_empty()) {
        jar = jar.add(short_lived_cookie(DETAIL_COOKIE, detail.to_uppercase()));
    }
    if let Some(source) = signal.source.as_deref() {
        jar = jar.add(short_lived_cookie(ORIGIN_COOKIE, source.to_string()));
    }

    if raised_at == endpoints::VERIFY_LOGIN {
        let body = RedirectBody {
            redirect_url: signal.destination,
        };
        (jar, Json(body)).into_response()
    } else {
        (jar, Redirect::to(&signal.destination)).into_response()
    }
}

fn short_lived_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(REDIRECT_COOKIE_MAX_AGE_SECS));
    cookie
}

/// Build the session cookie issued after a successful verification.
pub fn session_cookie(token: String, max_age_secs: u64) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(
        i64::try_from(max_age_secs).unwrap_or(i64::MAX),
    ));
    cookie
}

/// Remove a cookie set by this crate.
pub fn remove_cookie(jar: CookieJar, name: &str) -> CookieJar {
    let mut cookie = Cookie::new(name.to_string(), "");
    cookie.set_path("/");
    jar.remove(cookie)
}

/// Headers attached to every deauthorized response.
pub const DEAUTHORIZED_HEADERS: [(HeaderName, &str); 2] = [
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::AUTHORIZATION, ""),
];

/// Clear every cookie present on the request except those in `keep`.
pub fn deauthorize(jar: CookieJar, keep: &[&str]) -> CookieJar {
    let names: Vec<String> = jar
        .iter()
        .map(|cookie| cookie.name().to_string())
        .filter(|name| !keep.contains(&name.as_str()))
        .collect();

    names.iter().fold(jar, |jar, name| {
        tracing::debug!(cookie = %name, "Deleting cookie");
        remove_cookie(jar, name)
    })
}

//! Session gate middleware for axum.

use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, Extensions, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::{GateError, GateResult};
use crate::gate::{
    endpoints, translate, Outcome, RedirectSignal, SESSION_COOKIE, SESSION_INVALID_DETAIL,
};
use crate::session::{Binding, ClientIdentity};
use crate::AppState;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Work out which client a request belongs to.
///
/// Uses the first `X-Forwarded-For` entry when `trust_forwarded_for` is set
/// and the header is present, otherwise the peer socket address.
pub fn resolve_identity(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded_for: bool,
) -> GateResult<ClientIdentity> {
    if trust_forwarded_for {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(forwarded) = forwarded {
            return Ok(ClientIdentity::new(forwarded));
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| ClientIdentity::from(addr.ip()))
        .ok_or(GateError::MissingTransportContext)
}

#[async_trait]
impl FromRequestParts<AppState> for ClientIdentity {
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve_identity(
            &parts.headers,
            &parts.extensions,
            state.config.trust_forwarded_for,
        )
    }
}

/// Gate a protected route behind a valid session.
///
/// On success the caller's [`SessionRecord`](crate::session::SessionRecord)
/// is added to the request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let client = match resolve_identity(
        request.headers(),
        request.extensions(),
        state.config.trust_forwarded_for,
    ) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Cannot identify client");
            return e.into_response();
        }
    };

    let route = state.routes.route(&path);
    if let Some(route) = &route {
        if !route.permits(request.method()) {
            return GateError::MethodNotAllowed(request.method().to_string()).into_response();
        }
    }
    let expired = route.is_some_and(|r| r.binding == Binding::Expired);

    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    match state.guard.check(&client, token.as_deref(), &path) {
        Outcome::Allow(record) => {
            if expired {
                state.expiry.hold(&client, &path, record.generation);
            }
            request.extensions_mut().insert(record);
            next.run(request).await
        }
        Outcome::Redirect(signal) => {
            let signal = if expired {
                RedirectSignal::to(endpoints::SESSION)
                    .with_source(path.as_str())
                    .with_detail(SESSION_INVALID_DETAIL)
            } else {
                signal
            };
            translate(signal, &path, jar)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn extensions_with_peer(addr: &str) -> Extensions {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
        extensions
    }

    #[test]
    fn test_identity_from_peer_address() {
        let identity =
            resolve_identity(&HeaderMap::new(), &extensions_with_peer("192.168.1.5:50000"), false)
                .unwrap();
        assert_eq!(identity.as_str(), "192.168.1.5");
    }

    #[test]
    fn test_forwarded_for_only_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        let extensions = extensions_with_peer("10.0.0.1:443");

        let trusted = resolve_identity(&headers, &extensions, true).unwrap();
        assert_eq!(trusted.as_str(), "203.0.113.9");

        let untrusted = resolve_identity(&headers, &extensions, false).unwrap();
        assert_eq!(untrusted.as_str(), "10.0.0.1");
    }

    #[test]
    fn test_missing_transport_context() {
        let result = resolve_identity(&HeaderMap::new(), &Extensions::new(), true);
        assert!(matches!(result, Err(GateError::MissingTransportContext)));
    }
}

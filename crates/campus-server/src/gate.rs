//! Session gate middleware

use axum::{
    extract::Request,
    http::{header::COOKIE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use campus::session::{gate, GateDecision, SESSION_COOKIE};
use cookie::Cookie;
use tracing::debug;

/// Redirect admin requests without a session to the login page, and
/// logged-in visitors away from it.
pub async fn session_gate(request: Request, next: Next) -> Response {
    let has_session = has_session(request.headers());

    match gate(request.uri().path(), has_session) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::Redirect(to) => {
            debug!(path = %request.uri().path(), to, "Session gate redirect");
            Redirect::to(to).into_response()
        }
    }
}

/// Whether the request carries a non-empty session cookie
pub fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .any(|cookie| cookie.name() == SESSION_COOKIE && !cookie.value().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_has_session() {
        assert!(has_session(&headers("session=true")));
        assert!(has_session(&headers("theme=dark; session=true")));
        assert!(!has_session(&headers("session=")));
        assert!(!has_session(&headers("sessions=true")));
        assert!(!has_session(&HeaderMap::new()));
    }
}

//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::error;

use crate::web::rest::ErrorBody;
use crate::web::state::AppState;

/// The cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "thetamind_user";

/// Pulls the session token out of the request's `Cookie` header, if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|c| {
            c.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
}

/// Middleware that resolves the session cookie to a `User`.
///
/// If valid, inserts the `User` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized with a JSON error body.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new("Authentication required")),
        )
    };

    let token = session_token(req.headers()).ok_or_else(unauthorized)?;

    let user = state
        .sessions
        .resolve_session(token)
        .await
        .map_err(|e| {
            error!("Failed to resolve session: {e:?}");
            unauthorized()
        })?
        .ok_or_else(unauthorized)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_is_parsed_out_of_a_multi_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; thetamind_user=tok-123; lang=en"),
        );
        assert_eq!(session_token(&headers), Some("tok-123"));
    }

    #[test]
    fn missing_or_foreign_cookies_yield_none() {
        assert_eq!(session_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_token(&headers), None);

        // A cookie whose name merely starts with ours does not match.
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("thetamind_userx=evil"),
        );
        assert_eq!(session_token(&headers), None);
    }
}

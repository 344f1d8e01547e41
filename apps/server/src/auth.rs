//! Cookie-based session gate

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use pulldeck_core::Session;

pub const SESSION_COOKIE: &str = "pulldeck_token";

/// Pull the session token out of the request's `Cookie` headers
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value carrying a freshly issued session
pub fn session_cookie(session: &Session) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Expires={}",
        SESSION_COOKIE,
        session.token,
        session.expires_at.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}

/// `Set-Cookie` value telling the browser to forget the session
pub fn cleared_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    )
}

/// Reject requests that do not carry a live session
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let valid = session_token(request.headers())
        .map(|token| state.sessions.validate(&token))
        .unwrap_or(false);

    if valid {
        return next.run(request).await;
    }

    let mut response =
        ApiError::Unauthorized("missing or expired session".to_string()).into_response();
    if let Ok(value) = HeaderValue::from_str(&cleared_cookie()) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

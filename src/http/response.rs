//! Response construction.
//!
//! # Responsibilities
//! - Serialize a dispatch outcome as status + JSON body
//! - Attach the session cookie when a session was just created
//!
//! # Design Decisions
//! - Success values pass through unchanged with 200
//! - Errors use `DispatchError`'s own status and body

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::config::SessionConfig;
use crate::dispatch::Dispatched;
use crate::observability::metrics;

/// Build the `Set-Cookie` value for a session id.
pub fn session_cookie(config: &SessionConfig, session_id: &str) -> Option<HeaderValue> {
    let secure = if config.secure { "; Secure" } else { "" };
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax{}",
        config.cookie_name, session_id, secure
    );
    HeaderValue::from_str(&cookie).ok()
}

/// Turn a dispatch outcome into a wire response.
pub fn into_response(dispatched: Dispatched, session: &SessionConfig) -> Response {
    let mut response = match dispatched.result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(err) => err.into_response(),
    };

    if let Some(resolved) = dispatched.session.filter(|s| s.created) {
        metrics::record_session_created();
        match session_cookie(session, resolved.session.id()) {
            Some(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            None => tracing::warn!("Session id is not a valid header value"),
        }
    }

    response
}

//! services/api/src/web/middleware.rs
//!
//! Middleware that decides who a request acts for.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use task_tracker_core::ports::PortError;
use tracing::{debug, error};
use uuid::Uuid;

use crate::web::state::{AppState, Owner};

/// Extracts the auth session id from the `session` cookie.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

/// Looks up the signed-in user, if any. An unknown or expired session is
/// treated as anonymous; a store failure is an error.
async fn authenticated_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Uuid>, StatusCode> {
    let Some(session_id) = session_cookie(headers) else {
        return Ok(None);
    };
    match state.users.validate_auth_session(session_id).await {
        Ok(user_id) => Ok(Some(user_id)),
        Err(PortError::Unauthorized) | Err(PortError::NotFound(_)) => Ok(None),
        Err(e) => {
            error!("Failed to validate auth session: {:?}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Picks the task backend for this request.
///
/// A valid session selects the server store scoped to that user. Without
/// one the request falls back to the local store, unless local mode is
/// disabled, in which case it is rejected with 401.
pub async fn resolve_owner(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let owner = match authenticated_user(&state, req.headers()).await? {
        Some(user_id) => Owner::server(user_id, state.tasks.clone()),
        None if state.config.local_mode_enabled => Owner::local(state.local_tasks.clone()),
        None => return Err(StatusCode::UNAUTHORIZED),
    };
    debug!("Request runs in {} mode", owner.mode.as_str());

    req.extensions_mut().insert(owner);
    Ok(next.run(req).await)
}

/// Guards routes that only make sense for an account. The signed-in user's
/// id is handed to handlers as an `Extension<Uuid>`.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = authenticated_user(&state, req.headers())
        .await?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_the_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc-123; lang=en"),
        );
        assert_eq!(session_cookie(&headers), Some("abc-123"));
    }

    #[test]
    fn empty_or_missing_session_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_cookie(&headers), None);
    }
}

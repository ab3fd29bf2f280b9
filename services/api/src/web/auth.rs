//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, and logout.

use crate::web::{middleware::session_cookie, rest::port_error_response, state::AppState};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use task_tracker_core::{ports::PortError, tasks};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const SESSION_TTL_DAYS: i64 = 30;
pub const MIN_PASSWORD_CHARS: usize = 6;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_tasks_created: Option<u64>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_registration(req: &RegisterRequest) -> Result<(), (StatusCode, String)> {
    let bad = |msg: &str| Err((StatusCode::BAD_REQUEST, msg.to_string()));
    if req.name.trim().is_empty() {
        return bad("Name is required");
    }
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return bad("A valid email is required");
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return bad("Password must be at least 6 characters");
    }
    Ok(())
}

fn session_cookie_header(session_id: &str, max_age: i64) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id, max_age
    )
}

/// Creates an auth session for `user_id` and returns the `Set-Cookie` value.
async fn start_session(state: &AppState, user_id: Uuid) -> Result<String, (StatusCode, String)> {
    let session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(SESSION_TTL_DAYS);

    state
        .users
        .create_auth_session(&session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| port_error_response(e, "create session"))?;

    Ok(session_cookie_header(&session_id, ttl.num_seconds()))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new account and seed its sample tasks
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Missing name or email, or password too short"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate_registration(&req)?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    let user = state
        .users
        .create_user(req.name.trim(), &normalize_email(&req.email), &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => (
                StatusCode::CONFLICT,
                "An account with this email already exists".to_string(),
            ),
            other => port_error_response(other, "create user"),
        })?;
    info!("Registered user {}", user.id);

    let cookie = start_session(&state, user.id).await?;

    // A new account without samples is still a usable account.
    let sample_tasks_created =
        match tasks::initialize_samples(state.tasks.as_ref(), user.id, Utc::now()).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("Failed to seed sample tasks for user {}: {:?}", user.id, e);
                None
            }
        };

    let response = AuthResponse {
        user_id: user.id,
        name: user.name,
        email: user.email,
        sample_tasks_created,
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string());

    let creds = state
        .users
        .get_user_by_email(&normalize_email(&req.email))
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => invalid(),
            other => port_error_response(other, "look up user"),
        })?;

    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(invalid());
    }

    let cookie = start_session(&state, creds.user.id).await?;

    let response = AuthResponse {
        user_id: creds.user.id,
        name: creds.user.name,
        email: creds.user.email,
        sample_tasks_created: None,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session_id = session_cookie(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .users
        .delete_auth_session(session_id)
        .await
        .map_err(|e| port_error_response(e, "logout"))?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie_header("", 0))],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn registration_requires_every_field() {
        assert!(validate_registration(&request("Ada", "ada@example.com", "secret")).is_ok());
        assert!(validate_registration(&request("  ", "ada@example.com", "secret")).is_err());
        assert!(validate_registration(&request("Ada", "", "secret")).is_err());
        assert!(validate_registration(&request("Ada", "ada@example.com", "12345")).is_err());
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = session_cookie_header("", 0);
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.ends_with("Max-Age=0"));
    }
}

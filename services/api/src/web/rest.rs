//! services/api/src/web/rest.rs
//!
//! Contains the master definition for the OpenAPI specification, the shared
//! mapping from port errors to HTTP responses, and the health endpoint.

use crate::web::{analytics, auth, samples, state::AppState, tasks};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use task_tracker_core::ports::PortError;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        tasks::list_tasks_handler,
        tasks::create_task_handler,
        tasks::update_task_handler,
        tasks::toggle_task_handler,
        tasks::delete_task_handler,
        tasks::clear_completed_handler,
        tasks::list_categories_handler,
        analytics::analytics_handler,
        samples::initialize_samples_handler,
        samples::clear_samples_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            tasks::PriorityDto,
            tasks::FilterDto,
            tasks::TaskResponse,
            tasks::TaskEnvelope,
            tasks::TaskListResponse,
            tasks::CreateTaskRequest,
            tasks::UpdateTaskRequest,
            tasks::MessageResponse,
            tasks::DeletedResponse,
            tasks::DeletedMessageResponse,
            tasks::CategoriesResponse,
            analytics::AnalyticsView,
            analytics::OverviewResponse,
            analytics::ProductivityPointResponse,
            analytics::CategoryBucketResponse,
            samples::InitializeSamplesResponse,
        )
    ),
    tags(
        (name = "Task Tracker API", description = "Task management and productivity analytics.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a port failure onto a status code and message. Unexpected errors are
/// logged and replaced with a generic message naming the failed `action`.
pub fn port_error_response(e: PortError, action: &str) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(_) => {
            error!("Failed to {}: {:?}", action, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {}", action),
            )
        }
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: DateTime<Utc>,
    database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Reports whether the service can reach its database.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 500, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_handler(
    State(app_state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    match app_state.tasks.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                timestamp: Utc::now(),
                database: "connected".to_string(),
                error: None,
            }),
        ),
        Err(e) => {
            error!("Health check failed: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    timestamp: Utc::now(),
                    database: "disconnected".to_string(),
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

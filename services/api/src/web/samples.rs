//! services/api/src/web/samples.rs
//!
//! Sample-data endpoints for signed-in users.

use crate::web::{rest::port_error_response, state::AppState, tasks::DeletedMessageResponse};
use axum::{extract::State, http::StatusCode, response::{IntoResponse, Json}, Extension};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use task_tracker_core::tasks;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitializeSamplesResponse {
    message: String,
    initialized: bool,
    tasks_created: u64,
}

/// Seed the sample tasks. Does nothing if the user already has them.
#[utoipa::path(
    post,
    path = "/user/initialize",
    responses(
        (status = 200, description = "Samples seeded or already present", body = InitializeSamplesResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn initialize_samples_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let tasks_created = tasks::initialize_samples(state.tasks.as_ref(), user_id, Utc::now())
        .await
        .map_err(|e| port_error_response(e, "initialize sample data"))?;

    let response = if tasks_created == 0 {
        InitializeSamplesResponse {
            message: "User already has sample data".to_string(),
            initialized: false,
            tasks_created,
        }
    } else {
        info!("Seeded {} sample tasks for user {}", tasks_created, user_id);
        InitializeSamplesResponse {
            message: "Sample data created successfully".to_string(),
            initialized: true,
            tasks_created,
        }
    };
    Ok(Json(response))
}

/// Remove every sample task.
#[utoipa::path(
    delete,
    path = "/user/clear-samples",
    responses(
        (status = 200, description = "Samples removed", body = DeletedMessageResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn clear_samples_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let deleted_count = tasks::clear_samples(state.tasks.as_ref(), user_id)
        .await
        .map_err(|e| port_error_response(e, "clear sample data"))?;

    Ok(Json(DeletedMessageResponse::new(
        format!("Cleared {} sample tasks", deleted_count),
        deleted_count,
    )))
}

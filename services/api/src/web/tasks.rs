//! services/api/src/web/tasks.rs
//!
//! Axum handlers for task CRUD. Every handler acts on the `Owner` chosen by
//! the `resolve_owner` middleware, so the same code serves signed-in users
//! and local mode.

use crate::web::{rest::port_error_response, state::Owner};
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use task_tracker_core::domain::{CompletionFilter, NewTask, Priority, Task, TaskFilter, TaskPatch};
use task_tracker_core::tasks;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PriorityDto {
    Low,
    Medium,
    High,
}

impl From<Priority> for PriorityDto {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => PriorityDto::Low,
            Priority::Medium => PriorityDto::Medium,
            Priority::High => PriorityDto::High,
        }
    }
}

impl From<PriorityDto> for Priority {
    fn from(priority: PriorityDto) -> Self {
        match priority {
            PriorityDto::Low => Priority::Low,
            PriorityDto::Medium => Priority::Medium,
            PriorityDto::High => Priority::High,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FilterDto {
    #[default]
    All,
    Active,
    Completed,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    description: Option<String>,
    completed: bool,
    priority: PriorityDto,
    category: Option<String>,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            owner_id: task.owner_id,
            title: task.title,
            description: task.description,
            completed: task.completed,
            priority: task.priority.into(),
            category: task.category,
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
            completed_at: task.completed_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TaskEnvelope {
    task: TaskResponse,
}

#[derive(Serialize, ToSchema)]
pub struct TaskListResponse {
    tasks: Vec<TaskResponse>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    title: String,
    description: Option<String>,
    priority: Option<PriorityDto>,
    category: Option<String>,
    due_date: Option<NaiveDate>,
}

/// Partial update. Omitted fields stay as they are; an explicit `null`
/// clears `description`, `category` or `dueDate`.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    description: Option<Option<String>>,
    completed: Option<bool>,
    priority: Option<PriorityDto>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    category: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, format = Date)]
    due_date: Option<Option<NaiveDate>>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(req: UpdateTaskRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            completed: req.completed,
            priority: req.priority.map(Priority::from),
            category: req.category,
            due_date: req.due_date,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTasksQuery {
    /// `all` (default), `active` or `completed`.
    filter: Option<FilterDto>,
    /// Exact category to match.
    category: Option<String>,
}

impl From<ListTasksQuery> for TaskFilter {
    fn from(query: ListTasksQuery) -> Self {
        let completion = match query.filter.unwrap_or_default() {
            FilterDto::All => CompletionFilter::All,
            FilterDto::Active => CompletionFilter::Active,
            FilterDto::Completed => CompletionFilter::Completed,
        };
        Self {
            completion,
            category: query.category.filter(|c| !c.is_empty()),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    message: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    deleted_count: u64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMessageResponse {
    message: String,
    deleted_count: u64,
}

impl DeletedMessageResponse {
    pub fn new(message: String, deleted_count: u64) -> Self {
        Self {
            message,
            deleted_count,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CategoriesResponse {
    categories: Vec<String>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the owner's tasks, newest first.
#[utoipa::path(
    get,
    path = "/tasks",
    params(ListTasksQuery),
    responses(
        (status = 200, description = "Tasks for the current owner", body = TaskListResponse),
        (status = 401, description = "Not signed in and local mode is disabled"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_tasks_handler(
    Extension(owner): Extension<Owner>,
    Query(query): Query<ListTasksQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let filter = TaskFilter::from(query);
    let tasks = tasks::list_tasks(owner.store.as_ref(), owner.id, &filter)
        .await
        .map_err(|e| port_error_response(e, "load tasks"))?;

    Ok(Json(TaskListResponse {
        tasks: tasks.into_iter().map(TaskResponse::from).collect(),
    }))
}

/// Create a task.
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskEnvelope),
        (status = 400, description = "Validation failed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_task_handler(
    Extension(owner): Extension<Owner>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let input = NewTask {
        title: req.title,
        description: req.description,
        priority: req.priority.map(Priority::from),
        category: req.category,
        due_date: req.due_date,
    };
    let task = tasks::create_task(owner.store.as_ref(), owner.id, input, Utc::now())
        .await
        .map_err(|e| port_error_response(e, "create task"))?;

    Ok((
        StatusCode::CREATED,
        Json(TaskEnvelope {
            task: task.into(),
        }),
    ))
}

/// Update some or all fields of a task.
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    request_body = UpdateTaskRequest,
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task updated", body = TaskEnvelope),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Task not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_task_handler(
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let task = tasks::update_task(owner.store.as_ref(), owner.id, id, req.into(), Utc::now())
        .await
        .map_err(|e| port_error_response(e, "update task"))?;

    Ok(Json(TaskEnvelope { task: task.into() }))
}

/// Flip a task between open and completed.
#[utoipa::path(
    post,
    path = "/tasks/{id}/toggle",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task toggled", body = TaskEnvelope),
        (status = 404, description = "Task not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn toggle_task_handler(
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let task = tasks::toggle_task(owner.store.as_ref(), owner.id, id, Utc::now())
        .await
        .map_err(|e| port_error_response(e, "toggle task"))?;

    Ok(Json(TaskEnvelope { task: task.into() }))
}

/// Delete a task.
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 404, description = "Task not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_task_handler(
    Extension(owner): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tasks::delete_task(owner.store.as_ref(), owner.id, id)
        .await
        .map_err(|e| port_error_response(e, "delete task"))?;

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

/// Delete every completed task.
#[utoipa::path(
    delete,
    path = "/tasks/completed",
    responses(
        (status = 200, description = "Completed tasks removed", body = DeletedResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn clear_completed_handler(
    Extension(owner): Extension<Owner>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let deleted_count = tasks::clear_completed(owner.store.as_ref(), owner.id)
        .await
        .map_err(|e| port_error_response(e, "clear completed tasks"))?;

    Ok(Json(DeletedResponse { deleted_count }))
}

/// Distinct categories in use, alphabetically.
#[utoipa::path(
    get,
    path = "/tasks/categories",
    responses(
        (status = 200, description = "Categories in use", body = CategoriesResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_categories_handler(
    Extension(owner): Extension<Owner>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let categories = tasks::list_categories(owner.store.as_ref(), owner.id)
        .await
        .map_err(|e| port_error_response(e, "load categories"))?;

    Ok(Json(CategoriesResponse { categories }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"category": null, "completed": true}"#).unwrap();
        let patch = TaskPatch::from(req);
        assert_eq!(patch.category, Some(None));
        assert_eq!(patch.description, None);
        assert_eq!(patch.due_date, None);
        assert_eq!(patch.completed, Some(true));
    }

    #[test]
    fn update_request_parses_dates_and_priority() {
        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"dueDate": "2025-04-01", "priority": "high"}"#).unwrap();
        let patch = TaskPatch::from(req);
        assert_eq!(patch.due_date, Some(NaiveDate::from_ymd_opt(2025, 4, 1)));
        assert_eq!(patch.priority, Some(Priority::High));
    }

    #[test]
    fn empty_category_query_matches_everything() {
        let filter = TaskFilter::from(ListTasksQuery {
            filter: Some(FilterDto::Active),
            category: Some(String::new()),
        });
        assert_eq!(filter.completion, CompletionFilter::Active);
        assert_eq!(filter.category, None);
    }

    #[test]
    fn deleted_message_serializes_in_camel_case() {
        let body = DeletedMessageResponse::new("Cleared 2 sample tasks".to_string(), 2);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"message": "Cleared 2 sample tasks", "deletedCount": 2})
        );
    }
}

pub mod analytics;
pub mod auth;
pub mod middleware;
pub mod rest;
pub mod samples;
pub mod state;
pub mod tasks;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::{require_auth, resolve_owner};
pub use state::AppState;

/// Builds the API router. Task and analytics routes act for whichever
/// owner `resolve_owner` picks; `/user/*` routes need a signed-in user.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    let owner_routes = Router::new()
        .route(
            "/tasks",
            get(tasks::list_tasks_handler).post(tasks::create_task_handler),
        )
        .route("/tasks/completed", delete(tasks::clear_completed_handler))
        .route("/tasks/categories", get(tasks::list_categories_handler))
        .route(
            "/tasks/{id}",
            put(tasks::update_task_handler).delete(tasks::delete_task_handler),
        )
        .route("/tasks/{id}/toggle", post(tasks::toggle_task_handler))
        .route("/analytics", get(analytics::analytics_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            resolve_owner,
        ));

    let user_routes = Router::new()
        .route("/user/initialize", post(samples::initialize_samples_handler))
        .route("/user/clear-samples", delete(samples::clear_samples_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(owner_routes)
        .merge(user_routes)
        .with_state(state)
}

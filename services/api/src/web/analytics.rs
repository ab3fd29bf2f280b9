//! services/api/src/web/analytics.rs
//!
//! The analytics endpoint. One route serves three views selected by the
//! `type` query parameter.

use crate::web::{
    rest::port_error_response,
    state::{AppState, Owner},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use task_tracker_core::domain::{CategoryBucket, Overview, ProductivityPoint};
use task_tracker_core::Analytics;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 365;

//=========================================================================================
// Query and Response Types
//=========================================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsView {
    #[default]
    Overview,
    Productivity,
    Categories,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// Trailing window length in days, 1 to 365. Defaults to 7.
    days: Option<u32>,
    /// `overview` (default), `productivity` or `categories`.
    #[serde(rename = "type")]
    view: Option<AnalyticsView>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    tasks_created: u64,
    tasks_completed: u64,
    active_tasks: u64,
    completion_rate: u8,
    streak: u32,
    average_per_day: f64,
}

impl From<Overview> for OverviewResponse {
    fn from(o: Overview) -> Self {
        Self {
            tasks_created: o.tasks_created,
            tasks_completed: o.tasks_completed,
            active_tasks: o.active_tasks,
            completion_rate: o.completion_rate,
            streak: o.streak,
            average_per_day: o.average_per_day,
        }
    }
}

/// A day of the productivity chart. `date` is the display label and `day`
/// the calendar date it stands for.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityPointResponse {
    date: String,
    day: NaiveDate,
    created: u64,
    completed: u64,
    completion_rate: u8,
}

impl From<ProductivityPoint> for ProductivityPointResponse {
    fn from(p: ProductivityPoint) -> Self {
        Self {
            date: p.label,
            day: p.date,
            created: p.created,
            completed: p.completed,
            completion_rate: p.completion_rate,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBucketResponse {
    category: String,
    count: u64,
    completed: u64,
    completion_rate: u8,
}

impl From<CategoryBucket> for CategoryBucketResponse {
    fn from(b: CategoryBucket) -> Self {
        Self {
            category: b.category,
            count: b.count,
            completed: b.completed,
            completion_rate: b.completion_rate,
        }
    }
}

fn validate_days(days: Option<u32>) -> Result<u32, (StatusCode, String)> {
    match days.unwrap_or(DEFAULT_DAYS) {
        d @ 1..=MAX_DAYS => Ok(d),
        d => Err((
            StatusCode::BAD_REQUEST,
            format!("days must be between 1 and {}, got {}", MAX_DAYS, d),
        )),
    }
}

//=========================================================================================
// Handler
//=========================================================================================

/// Overview metrics, a daily productivity series, or a category breakdown
/// over the trailing `days` local days.
#[utoipa::path(
    get,
    path = "/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Overview for `type=overview`", body = OverviewResponse),
        (status = 200, description = "One point per day for `type=productivity`", body = Vec<ProductivityPointResponse>),
        (status = 200, description = "Largest category first for `type=categories`", body = Vec<CategoryBucketResponse>),
        (status = 400, description = "Unknown type or days out of range"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn analytics_handler(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Owner>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, (StatusCode, String)> {
    let days = validate_days(query.days)?;
    let view = query.view.unwrap_or_default();
    let now = Utc::now();

    let analytics = Analytics::new(owner.store.as_ref(), state.config.day_offset);
    let window = analytics
        .trailing_window(days, now)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    debug!(
        "Analytics {:?} for {} over {}..{}",
        view,
        owner.id,
        window.start(),
        window.end()
    );

    let response = match view {
        AnalyticsView::Overview => {
            let overview = analytics
                .overview(owner.id, &window, now)
                .await
                .map_err(|e| port_error_response(e, "compute overview"))?;
            Json(OverviewResponse::from(overview)).into_response()
        }
        AnalyticsView::Productivity => {
            let points = analytics
                .productivity(owner.id, &window)
                .await
                .map_err(|e| port_error_response(e, "compute productivity"))?;
            Json(
                points
                    .into_iter()
                    .map(ProductivityPointResponse::from)
                    .collect::<Vec<_>>(),
            )
            .into_response()
        }
        AnalyticsView::Categories => {
            let buckets = analytics
                .categories(owner.id, &window)
                .await
                .map_err(|e| port_error_response(e, "compute category breakdown"))?;
            Json(
                buckets
                    .into_iter()
                    .map(CategoryBucketResponse::from)
                    .collect::<Vec<_>>(),
            )
            .into_response()
        }
    };
    Ok(response)
}

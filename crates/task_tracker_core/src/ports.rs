//! crates/task_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific storage implementations.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

use crate::analytics::day_bounds;
use crate::domain::{CategoryCount, Task, TaskActivity, TaskFilter, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, filesystem).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Owner-scoped task persistence plus the range queries analytics relies on.
///
/// All range bounds are inclusive on both ends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    // --- Task CRUD ---
    async fn insert_task(&self, task: Task) -> PortResult<()>;

    async fn insert_tasks(&self, tasks: Vec<Task>) -> PortResult<()>;

    async fn get_task(&self, owner: Uuid, id: Uuid) -> PortResult<Task>;

    /// Overwrites the stored record with the same id and owner.
    async fn save_task(&self, task: &Task) -> PortResult<()>;

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> PortResult<()>;

    /// Tasks matching `filter`, newest first.
    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> PortResult<Vec<Task>>;

    async fn delete_completed(&self, owner: Uuid) -> PortResult<u64>;

    async fn count_in_category(&self, owner: Uuid, category: &str) -> PortResult<u64>;

    async fn delete_in_category(&self, owner: Uuid, category: &str) -> PortResult<u64>;

    // --- Analytics Queries ---
    async fn count_created_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64>;

    async fn count_completed_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64>;

    /// Incomplete tasks regardless of when they were created.
    async fn count_active(&self, owner: Uuid) -> PortResult<u64>;

    /// Tasks created in range with a non-empty category, grouped by exact
    /// category. Groups come back in first-seen (earliest `created_at`) order.
    async fn category_counts_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<CategoryCount>>;

    /// Timestamps of every task created or completed in range.
    async fn list_activity_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<TaskActivity>>;

    async fn count_completed_on_day(
        &self,
        owner: Uuid,
        day: NaiveDate,
        offset: FixedOffset,
    ) -> PortResult<u64> {
        let (start, end) = day_bounds(day, offset);
        self.count_completed_between(owner, start, end).await
    }

    /// Cheap liveness check of the backing storage.
    async fn ping(&self) -> PortResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `PortError::Conflict` when the email is already registered.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the session's user, or `PortError::Unauthorized` if it is
    /// unknown or expired.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}

//! crates/task_tracker_core/src/tasks.rs
//!
//! Task operations shared by every storage backend. Validation and the
//! completion bookkeeping live here so the server store and the local
//! store behave identically.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{NewTask, Task, TaskFilter, TaskPatch};
use crate::ports::{PortResult, TaskStore};
use crate::sample::{sample_tasks, SAMPLE_CATEGORY};

pub async fn create_task(
    store: &dyn TaskStore,
    owner: Uuid,
    input: NewTask,
    now: DateTime<Utc>,
) -> PortResult<Task> {
    let task = Task::new(owner, input, now)?;
    store.insert_task(task.clone()).await?;
    Ok(task)
}

pub async fn list_tasks(
    store: &dyn TaskStore,
    owner: Uuid,
    filter: &TaskFilter,
) -> PortResult<Vec<Task>> {
    store.list_tasks(owner, filter).await
}

/// Applies `patch` to the owner's task and stores the result. Concurrent
/// updates to the same task resolve as last write wins.
pub async fn update_task(
    store: &dyn TaskStore,
    owner: Uuid,
    id: Uuid,
    patch: TaskPatch,
    now: DateTime<Utc>,
) -> PortResult<Task> {
    let mut task = store.get_task(owner, id).await?;
    task.apply(patch, now)?;
    store.save_task(&task).await?;
    Ok(task)
}

pub async fn toggle_task(
    store: &dyn TaskStore,
    owner: Uuid,
    id: Uuid,
    now: DateTime<Utc>,
) -> PortResult<Task> {
    let current = store.get_task(owner, id).await?;
    let patch = TaskPatch {
        completed: Some(!current.completed),
        ..Default::default()
    };
    update_task(store, owner, id, patch, now).await
}

pub async fn delete_task(store: &dyn TaskStore, owner: Uuid, id: Uuid) -> PortResult<()> {
    store.delete_task(owner, id).await
}

pub async fn clear_completed(store: &dyn TaskStore, owner: Uuid) -> PortResult<u64> {
    store.delete_completed(owner).await
}

/// Distinct non-empty categories in alphabetical order.
pub async fn list_categories(store: &dyn TaskStore, owner: Uuid) -> PortResult<Vec<String>> {
    let tasks = store.list_tasks(owner, &TaskFilter::default()).await?;
    let categories: BTreeSet<String> = tasks
        .into_iter()
        .filter_map(|t| t.category)
        .filter(|c| !c.trim().is_empty())
        .collect();
    Ok(categories.into_iter().collect())
}

/// Seeds the sample tasks unless the owner already has some. Returns the
/// number inserted.
pub async fn initialize_samples(
    store: &dyn TaskStore,
    owner: Uuid,
    now: DateTime<Utc>,
) -> PortResult<u64> {
    if store.count_in_category(owner, SAMPLE_CATEGORY).await? > 0 {
        return Ok(0);
    }
    let samples = sample_tasks(owner, now);
    let inserted = samples.len() as u64;
    store.insert_tasks(samples).await?;
    Ok(inserted)
}

pub async fn clear_samples(store: &dyn TaskStore, owner: Uuid) -> PortResult<u64> {
    store.delete_in_category(owner, SAMPLE_CATEGORY).await
}

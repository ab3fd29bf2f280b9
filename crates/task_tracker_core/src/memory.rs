//! crates/task_tracker_core/src/memory.rs
//!
//! An in-memory `TaskStore`. It backs the single-device local mode (wrapped
//! with file persistence by the service) and doubles as the store for tests.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{CategoryCount, Task, TaskActivity, TaskFilter};
use crate::ports::{PortError, PortResult, TaskStore};

#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
        }
    }

    /// A copy of every task across all owners.
    pub fn snapshot(&self) -> PortResult<Vec<Task>> {
        Ok(self.read()?.clone())
    }

    /// Swaps the entire contents, e.g. to roll back to an earlier snapshot.
    pub fn replace_all(&self, tasks: Vec<Task>) -> PortResult<()> {
        *self.write()? = tasks;
        Ok(())
    }

    fn read(&self) -> PortResult<RwLockReadGuard<'_, Vec<Task>>> {
        self.tasks
            .read()
            .map_err(|_| PortError::Unexpected("task store lock poisoned".to_string()))
    }

    fn write(&self) -> PortResult<RwLockWriteGuard<'_, Vec<Task>>> {
        self.tasks
            .write()
            .map_err(|_| PortError::Unexpected("task store lock poisoned".to_string()))
    }

    fn count_where(&self, owner: Uuid, pred: impl Fn(&Task) -> bool) -> PortResult<u64> {
        let tasks = self.read()?;
        Ok(tasks
            .iter()
            .filter(|t| t.owner_id == owner && pred(t))
            .count() as u64)
    }

    fn delete_where(&self, owner: Uuid, pred: impl Fn(&Task) -> bool) -> PortResult<u64> {
        let mut tasks = self.write()?;
        let before = tasks.len();
        tasks.retain(|t| !(t.owner_id == owner && pred(t)));
        Ok((before - tasks.len()) as u64)
    }
}

fn in_range(ts: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start <= ts && ts <= end
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert_task(&self, task: Task) -> PortResult<()> {
        self.write()?.push(task);
        Ok(())
    }

    async fn insert_tasks(&self, tasks: Vec<Task>) -> PortResult<()> {
        self.write()?.extend(tasks);
        Ok(())
    }

    async fn get_task(&self, owner: Uuid, id: Uuid) -> PortResult<Task> {
        self.read()?
            .iter()
            .find(|t| t.id == id && t.owner_id == owner)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", id)))
    }

    async fn save_task(&self, task: &Task) -> PortResult<()> {
        let mut tasks = self.write()?;
        let slot = tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.owner_id == task.owner_id)
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", task.id)))?;
        *slot = task.clone();
        Ok(())
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> PortResult<()> {
        match self.delete_where(owner, |t| t.id == id)? {
            0 => Err(PortError::NotFound(format!("Task {} not found", id))),
            _ => Ok(()),
        }
    }

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> PortResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .read()?
            .iter()
            .filter(|t| t.owner_id == owner && filter.matches(t))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn delete_completed(&self, owner: Uuid) -> PortResult<u64> {
        self.delete_where(owner, |t| t.completed)
    }

    async fn count_in_category(&self, owner: Uuid, category: &str) -> PortResult<u64> {
        self.count_where(owner, |t| t.category.as_deref() == Some(category))
    }

    async fn delete_in_category(&self, owner: Uuid, category: &str) -> PortResult<u64> {
        self.delete_where(owner, |t| t.category.as_deref() == Some(category))
    }

    async fn count_created_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64> {
        self.count_where(owner, |t| in_range(t.created_at, start, end))
    }

    async fn count_completed_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64> {
        self.count_where(owner, |t| {
            t.completed_at.is_some_and(|ts| in_range(ts, start, end))
        })
    }

    async fn count_active(&self, owner: Uuid) -> PortResult<u64> {
        self.count_where(owner, |t| !t.completed)
    }

    async fn category_counts_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<CategoryCount>> {
        let tasks = self.read()?;
        let mut in_window: Vec<&Task> = tasks
            .iter()
            .filter(|t| t.owner_id == owner && in_range(t.created_at, start, end))
            .collect();
        in_window.sort_by_key(|t| t.created_at);

        let mut counts: Vec<CategoryCount> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for task in in_window {
            let Some(category) = task.category.as_deref().filter(|c| !c.is_empty()) else {
                continue;
            };
            let slot = *index.entry(category).or_insert_with(|| {
                counts.push(CategoryCount {
                    category: category.to_string(),
                    count: 0,
                    completed: 0,
                });
                counts.len() - 1
            });
            counts[slot].count += 1;
            if task.completed {
                counts[slot].completed += 1;
            }
        }
        Ok(counts)
    }

    async fn list_activity_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<TaskActivity>> {
        Ok(self
            .read()?
            .iter()
            .filter(|t| t.owner_id == owner)
            .filter(|t| {
                in_range(t.created_at, start, end)
                    || t.completed_at.is_some_and(|ts| in_range(ts, start, end))
            })
            .map(TaskActivity::from)
            .collect())
    }
}

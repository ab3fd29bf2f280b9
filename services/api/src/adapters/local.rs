//! services/api/src/adapters/local.rs
//!
//! The single-device store used when no user is signed in. Tasks live in
//! memory and are written back to a JSON file after every mutation, so the
//! load/save boundary is explicit and owned by this adapter.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use task_tracker_core::domain::{CategoryCount, Task, TaskActivity, TaskFilter};
use task_tracker_core::memory::MemoryTaskStore;
use task_tracker_core::ports::{PortError, PortResult, TaskStore};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

//=========================================================================================
// On-Disk Record
//=========================================================================================

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    #[serde(default)]
    description: Option<String>,
    completed: bool,
    priority: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl StoredTask {
    fn from_domain(task: &Task) -> Self {
        Self {
            id: task.id,
            owner_id: task.owner_id,
            title: task.title.clone(),
            description: task.description.clone(),
            completed: task.completed,
            priority: task.priority.as_str().to_string(),
            category: task.category.clone(),
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
            completed_at: task.completed_at,
        }
    }

    fn to_domain(self) -> PortResult<Task> {
        // Hand-edited files can break the completion invariant; repair it.
        let completed_at = match (self.completed, self.completed_at) {
            (true, None) => {
                warn!("Task {} is completed without a timestamp, using updatedAt", self.id);
                Some(self.updated_at)
            }
            (false, Some(_)) => {
                warn!("Task {} is open but has a completion timestamp, dropping it", self.id);
                None
            }
            (_, completed_at) => completed_at,
        };
        Ok(Task {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            priority: self.priority.parse()?,
            category: self.category,
            due_date: self.due_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at,
        })
    }
}

//=========================================================================================
// The Adapter Struct
//=========================================================================================

pub struct LocalFileStore {
    path: PathBuf,
    tasks: MemoryTaskStore,
    save_lock: Mutex<()>,
}

impl LocalFileStore {
    /// Loads the store from `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> PortResult<Self> {
        let path = path.into();
        let tasks = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<StoredTask> = serde_json::from_slice(&bytes).map_err(|e| {
                    PortError::Unexpected(format!("Corrupt local store {}: {}", path.display(), e))
                })?;
                records
                    .into_iter()
                    .map(StoredTask::to_domain)
                    .collect::<PortResult<Vec<Task>>>()?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(io_error(&path, e)),
        };
        debug!("Loaded {} local tasks from {}", tasks.len(), path.display());
        Ok(Self {
            path,
            tasks: MemoryTaskStore::with_tasks(tasks),
            save_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current contents to disk through a temporary file so a
    /// crash never leaves a half-written store behind. Callers hold
    /// `save_lock`.
    async fn persist(&self) -> PortResult<()> {
        let records: Vec<StoredTask> = self
            .tasks
            .snapshot()?
            .iter()
            .map(StoredTask::from_domain)
            .collect();
        let bytes = serde_json::to_vec_pretty(&records)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        debug!("Saved {} local tasks", records.len());
        Ok(())
    }

    /// Persists a change already applied in memory. If the file cannot be
    /// written, memory goes back to `before` so it never shows a change
    /// that is not on disk.
    async fn write_through<T>(&self, before: Vec<Task>, value: T) -> PortResult<T> {
        match self.persist().await {
            Ok(()) => Ok(value),
            Err(e) => {
                warn!("Failed to save local tasks, rolling back: {}", e);
                self.tasks.replace_all(before)?;
                Err(e)
            }
        }
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("{}: {}", path.display(), e))
}

//=========================================================================================
// `TaskStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TaskStore for LocalFileStore {
    async fn insert_task(&self, task: Task) -> PortResult<()> {
        let _guard = self.save_lock.lock().await;
        let before = self.tasks.snapshot()?;
        self.tasks.insert_task(task).await?;
        self.write_through(before, ()).await
    }

    async fn insert_tasks(&self, tasks: Vec<Task>) -> PortResult<()> {
        let _guard = self.save_lock.lock().await;
        let before = self.tasks.snapshot()?;
        self.tasks.insert_tasks(tasks).await?;
        self.write_through(before, ()).await
    }

    async fn get_task(&self, owner: Uuid, id: Uuid) -> PortResult<Task> {
        self.tasks.get_task(owner, id).await
    }

    async fn save_task(&self, task: &Task) -> PortResult<()> {
        let _guard = self.save_lock.lock().await;
        let before = self.tasks.snapshot()?;
        self.tasks.save_task(task).await?;
        self.write_through(before, ()).await
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> PortResult<()> {
        let _guard = self.save_lock.lock().await;
        let before = self.tasks.snapshot()?;
        self.tasks.delete_task(owner, id).await?;
        self.write_through(before, ()).await
    }

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> PortResult<Vec<Task>> {
        self.tasks.list_tasks(owner, filter).await
    }

    async fn delete_completed(&self, owner: Uuid) -> PortResult<u64> {
        let _guard = self.save_lock.lock().await;
        let before = self.tasks.snapshot()?;
        match self.tasks.delete_completed(owner).await? {
            0 => Ok(0),
            deleted => self.write_through(before, deleted).await,
        }
    }

    async fn count_in_category(&self, owner: Uuid, category: &str) -> PortResult<u64> {
        self.tasks.count_in_category(owner, category).await
    }

    async fn delete_in_category(&self, owner: Uuid, category: &str) -> PortResult<u64> {
        let _guard = self.save_lock.lock().await;
        let before = self.tasks.snapshot()?;
        match self.tasks.delete_in_category(owner, category).await? {
            0 => Ok(0),
            deleted => self.write_through(before, deleted).await,
        }
    }

    async fn count_created_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64> {
        self.tasks.count_created_between(owner, start, end).await
    }

    async fn count_completed_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64> {
        self.tasks.count_completed_between(owner, start, end).await
    }

    async fn count_active(&self, owner: Uuid) -> PortResult<u64> {
        self.tasks.count_active(owner).await
    }

    async fn category_counts_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<CategoryCount>> {
        self.tasks.category_counts_between(owner, start, end).await
    }

    async fn list_activity_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<TaskActivity>> {
        self.tasks.list_activity_between(owner, start, end).await
    }
}

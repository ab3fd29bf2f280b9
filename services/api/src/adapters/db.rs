//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation
//! of the `TaskStore` and `UserStore` ports from the `core` crate. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use task_tracker_core::domain::{
    AuthSession, CategoryCount, CompletionFilter, Task, TaskActivity, TaskFilter, User,
    UserCredentials,
};
use task_tracker_core::ports::{PortError, PortResult, TaskStore, UserStore};
use tracing::debug;
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, owner_id, title, description, completed, priority, category, \
     due_date, created_at, updated_at, completed_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `TaskStore` and `UserStore` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    hashed_password: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            created_at: self.created_at,
        }
    }

    fn to_credentials(self) -> UserCredentials {
        let hashed_password = self.hashed_password.clone();
        UserCredentials {
            user: self.to_domain(),
            hashed_password,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    id: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}
impl AuthSessionRecord {
    fn to_domain(self) -> AuthSession {
        AuthSession {
            id: self.id,
            user_id: self.user_id,
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct TaskRecord {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    description: Option<String>,
    completed: bool,
    priority: String,
    category: Option<String>,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}
impl TaskRecord {
    fn to_domain(self) -> PortResult<Task> {
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
            completed_at: self.completed_at,
        })
    }
}

#[derive(FromRow)]
struct CategoryCountRecord {
    category: String,
    count: i64,
    completed: i64,
}
impl CategoryCountRecord {
    fn to_domain(self) -> CategoryCount {
        CategoryCount {
            category: self.category,
            count: to_count(self.count),
            completed: to_count(self.completed),
        }
    }
}

#[derive(FromRow)]
struct ActivityRecord {
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}
impl ActivityRecord {
    fn to_domain(self) -> TaskActivity {
        TaskActivity {
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

//=========================================================================================
// `TaskStore` Trait Implementation
//=========================================================================================

impl DbAdapter {
    async fn insert_with<'e, E>(executor: E, task: &Task) -> Result<(), sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(&format!(
            "INSERT INTO tasks ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            TASK_COLUMNS
        ))
        .bind(task.id)
        .bind(task.owner_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.priority.as_str())
        .bind(&task.category)
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.completed_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    async fn count(
        &self,
        sql: &str,
        owner: Uuid,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> PortResult<u64> {
        let mut query = sqlx::query_scalar::<sqlx::Postgres, i64>(sql).bind(owner);
        if let Some((start, end)) = range {
            query = query.bind(start).bind(end);
        }
        let n = query.fetch_one(&self.pool).await.map_err(unexpected)?;
        Ok(to_count(n))
    }
}

#[async_trait]
impl TaskStore for DbAdapter {
    async fn insert_task(&self, task: Task) -> PortResult<()> {
        Self::insert_with(&self.pool, &task).await.map_err(unexpected)?;
        debug!("Inserted task {}", task.id);
        Ok(())
    }

    async fn insert_tasks(&self, tasks: Vec<Task>) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        for task in &tasks {
            Self::insert_with(&mut *tx, task).await.map_err(unexpected)?;
        }
        tx.commit().await.map_err(unexpected)?;
        debug!("Inserted {} tasks", tasks.len());
        Ok(())
    }

    async fn get_task(&self, owner: Uuid, id: Uuid) -> PortResult<Task> {
        let record = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {} FROM tasks WHERE id = $1 AND owner_id = $2",
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Task {} not found", id)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn save_task(&self, task: &Task) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE tasks SET title = $3, description = $4, completed = $5, priority = $6, \
             category = $7, due_date = $8, updated_at = $9, completed_at = $10 \
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(task.id)
        .bind(task.owner_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.completed)
        .bind(task.priority.as_str())
        .bind(&task.category)
        .bind(task.due_date)
        .bind(task.updated_at)
        .bind(task.completed_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Task {} not found", task.id)));
        }
        Ok(())
    }

    async fn delete_task(&self, owner: Uuid, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Task {} not found", id)));
        }
        Ok(())
    }

    async fn list_tasks(&self, owner: Uuid, filter: &TaskFilter) -> PortResult<Vec<Task>> {
        let completed = match filter.completion {
            CompletionFilter::All => None,
            CompletionFilter::Active => Some(false),
            CompletionFilter::Completed => Some(true),
        };
        let records = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {} FROM tasks WHERE owner_id = $1 \
             AND ($2::BOOLEAN IS NULL OR completed = $2) \
             AND ($3::TEXT IS NULL OR category = $3) \
             ORDER BY created_at DESC",
            TASK_COLUMNS
        ))
        .bind(owner)
        .bind(completed)
        .bind(filter.category.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(TaskRecord::to_domain).collect()
    }

    async fn delete_completed(&self, owner: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE owner_id = $1 AND completed")
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn count_in_category(&self, owner: Uuid, category: &str) -> PortResult<u64> {
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tasks WHERE owner_id = $1 AND category = $2",
        )
        .bind(owner)
        .bind(category)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(to_count(n))
    }

    async fn delete_in_category(&self, owner: Uuid, category: &str) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE owner_id = $1 AND category = $2")
            .bind(owner)
            .bind(category)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn count_created_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM tasks WHERE owner_id = $1 AND created_at BETWEEN $2 AND $3",
            owner,
            Some((start, end)),
        )
        .await
    }

    async fn count_completed_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM tasks WHERE owner_id = $1 AND completed_at BETWEEN $2 AND $3",
            owner,
            Some((start, end)),
        )
        .await
    }

    async fn count_active(&self, owner: Uuid) -> PortResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM tasks WHERE owner_id = $1 AND NOT completed",
            owner,
            None,
        )
        .await
    }

    async fn category_counts_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<CategoryCount>> {
        let records = sqlx::query_as::<_, CategoryCountRecord>(
            "SELECT category, \
                    COUNT(*) AS count, \
                    COUNT(*) FILTER (WHERE completed) AS completed \
             FROM tasks \
             WHERE owner_id = $1 AND created_at BETWEEN $2 AND $3 \
               AND category IS NOT NULL AND category <> '' \
             GROUP BY category \
             ORDER BY MIN(created_at) ASC",
        )
        .bind(owner)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(CategoryCountRecord::to_domain).collect())
    }

    async fn list_activity_between(
        &self,
        owner: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<TaskActivity>> {
        let records = sqlx::query_as::<_, ActivityRecord>(
            "SELECT created_at, completed_at FROM tasks \
             WHERE owner_id = $1 \
               AND (created_at BETWEEN $2 AND $3 OR completed_at BETWEEN $2 AND $3)",
        )
        .bind(owner)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(ActivityRecord::to_domain).collect())
    }

    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, name, email, hashed_password) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email, hashed_password, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if duplicate {
                PortError::Conflict(format!("User with email {} already exists", email))
            } else {
                unexpected(e)
            }
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, name, email, hashed_password, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_credentials())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let session = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT id, user_id, expires_at FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(AuthSessionRecord::to_domain)
        .ok_or(PortError::Unauthorized)?;

        if session.expires_at <= Utc::now() {
            debug!("Auth session {} has expired", session.id);
            return Err(PortError::Unauthorized);
        }
        Ok(session.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

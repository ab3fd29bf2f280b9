//! crates/task_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::PortError;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MAX_CATEGORY_CHARS: usize = 50;

/// The owner used for tasks kept in the single-device local store.
pub const LOCAL_OWNER_ID: Uuid = Uuid::nil();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(PortError::InvalidInput(format!(
                "Unknown priority '{}'",
                other
            ))),
        }
    }
}

/// A single task owned by exactly one user.
///
/// `completed_at` is `Some` exactly when `completed` is true. Use
/// [`Task::apply`] to mutate a task so the invariant holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub category: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a task. Fields are validated by [`Task::new`].
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// A partial update. The outer `Option` means "leave unchanged"; for the
/// nullable fields an inner `None` clears the value.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub category: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompletionFilter {
    #[default]
    All,
    Active,
    Completed,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub completion: CompletionFilter,
    pub category: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        let completion_ok = match self.completion {
            CompletionFilter::All => true,
            CompletionFilter::Active => !task.completed,
            CompletionFilter::Completed => task.completed,
        };
        let category_ok = match &self.category {
            Some(category) => task.category.as_deref() == Some(category.as_str()),
            None => true,
        };
        completion_ok && category_ok
    }
}

impl Task {
    /// Builds a fresh, uncompleted task from validated input.
    pub fn new(owner_id: Uuid, input: NewTask, now: DateTime<Utc>) -> Result<Self, PortError> {
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            title: normalize_title(&input.title)?,
            description: normalize_optional(input.description, "Description", MAX_DESCRIPTION_CHARS)?,
            completed: false,
            priority: input.priority.unwrap_or_default(),
            category: normalize_optional(input.category, "Category", MAX_CATEGORY_CHARS)?,
            due_date: input.due_date,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Applies a patch, keeping `completed_at` in step with `completed`.
    ///
    /// Validation happens before any field is touched, so a rejected patch
    /// leaves the task unchanged.
    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) -> Result<(), PortError> {
        let title = patch.title.as_deref().map(normalize_title).transpose()?;
        let description = patch
            .description
            .map(|d| normalize_optional(d, "Description", MAX_DESCRIPTION_CHARS))
            .transpose()?;
        let category = patch
            .category
            .map(|c| normalize_optional(c, "Category", MAX_CATEGORY_CHARS))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(completed) = patch.completed {
            self.set_completed(completed, now);
        }
        self.updated_at = now;
        Ok(())
    }

    fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        match (self.completed, completed) {
            (false, true) => self.completed_at = Some(now),
            (true, false) => self.completed_at = None,
            _ => {}
        }
        self.completed = completed;
    }
}

fn normalize_title(title: &str) -> Result<String, PortError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PortError::InvalidInput("Task title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(PortError::InvalidInput(format!(
            "Task title cannot exceed {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

fn normalize_optional(
    value: Option<String>,
    field: &str,
    max_chars: usize,
) -> Result<Option<String>, PortError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > max_chars {
        return Err(PortError::InvalidInput(format!(
            "{} cannot exceed {} characters",
            field, max_chars
        )));
    }
    Ok(Some(value.to_string()))
}

/// The two timestamps the productivity series buckets on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskActivity {
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Task> for TaskActivity {
    fn from(task: &Task) -> Self {
        Self {
            created_at: task.created_at,
            completed_at: task.completed_at,
        }
    }
}

/// Per-category tallies as returned by the store, before rates and sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
    pub completed: u64,
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/register - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Analytics Result Shapes
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub tasks_created: u64,
    pub tasks_completed: u64,
    pub active_tasks: u64,
    pub completion_rate: u8,
    pub streak: u32,
    pub average_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductivityPoint {
    pub date: NaiveDate,
    pub label: String,
    pub created: u64,
    pub completed: u64,
    pub completion_rate: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBucket {
    pub category: String,
    pub count: u64,
    pub completed: u64,
    pub completion_rate: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap()
    }

    fn task() -> Task {
        Task::new(
            Uuid::new_v4(),
            NewTask {
                title: "  Write report ".to_string(),
                category: Some(" Work ".to_string()),
                description: Some("   ".to_string()),
                ..Default::default()
            },
            at(9),
        )
        .unwrap()
    }

    #[test]
    fn new_task_trims_and_defaults() {
        let task = task();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.category.as_deref(), Some("Work"));
        assert_eq!(task.description, None);
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn new_task_rejects_blank_and_oversized_fields() {
        let owner = Uuid::new_v4();
        let blank = NewTask {
            title: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(Task::new(owner, blank, at(9)), Err(PortError::InvalidInput(_))));

        let long_title = NewTask {
            title: "x".repeat(MAX_TITLE_CHARS + 1),
            ..Default::default()
        };
        assert!(Task::new(owner, long_title, at(9)).is_err());

        let long_category = NewTask {
            title: "ok".to_string(),
            category: Some("c".repeat(MAX_CATEGORY_CHARS + 1)),
            ..Default::default()
        };
        assert!(Task::new(owner, long_category, at(9)).is_err());

        let exact_title = NewTask {
            title: "é".repeat(MAX_TITLE_CHARS),
            ..Default::default()
        };
        assert!(Task::new(owner, exact_title, at(9)).is_ok());
    }

    #[test]
    fn completing_sets_and_clears_completed_at() {
        let mut task = task();

        task.apply(TaskPatch { completed: Some(true), ..Default::default() }, at(10))
            .unwrap();
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(at(10)));

        // Re-completing keeps the original completion time.
        task.apply(TaskPatch { completed: Some(true), ..Default::default() }, at(11))
            .unwrap();
        assert_eq!(task.completed_at, Some(at(10)));
        assert_eq!(task.updated_at, at(11));

        task.apply(TaskPatch { completed: Some(false), ..Default::default() }, at(12))
            .unwrap();
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn invariant_holds_across_patch_sequences() {
        let mut task = task();
        let flips = [true, true, false, true, false, false, true];
        for (i, completed) in flips.into_iter().enumerate() {
            let now = at(9) + Duration::minutes(i as i64);
            task.apply(TaskPatch { completed: Some(completed), ..Default::default() }, now)
                .unwrap();
            assert_eq!(task.completed_at.is_some(), task.completed);
        }
    }

    #[test]
    fn rejected_patch_leaves_task_untouched() {
        let mut task = task();
        let before = task.clone();
        let patch = TaskPatch {
            title: Some(String::new()),
            completed: Some(true),
            ..Default::default()
        };
        assert!(task.apply(patch, at(10)).is_err());
        assert_eq!(task, before);
    }

    #[test]
    fn patch_can_clear_nullable_fields() {
        let mut task = task();
        let patch = TaskPatch {
            category: Some(None),
            due_date: Some(NaiveDate::from_ymd_opt(2025, 4, 1)),
            ..Default::default()
        };
        task.apply(patch, at(10)).unwrap();
        assert_eq!(task.category, None);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2025, 4, 1));
    }

    #[test]
    fn priority_round_trips_through_text() {
        for priority in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(priority.as_str().parse::<Priority>().unwrap(), priority);
        }
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn filter_matches_completion_and_category() {
        let mut task = task();
        let active_work = TaskFilter {
            completion: CompletionFilter::Active,
            category: Some("Work".to_string()),
        };
        assert!(active_work.matches(&task));

        task.apply(TaskPatch { completed: Some(true), ..Default::default() }, at(10))
            .unwrap();
        assert!(!active_work.matches(&task));
        assert!(TaskFilter {
            completion: CompletionFilter::Completed,
            category: None
        }
        .matches(&task));
    }
}

//! crates/task_tracker_core/src/sample.rs
//!
//! Starter tasks that introduce a new account to the app.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::{Priority, Task};

/// Every sample task is filed under this category so it can be cleared in one go.
pub const SAMPLE_CATEGORY: &str = "📚 Sample";

struct SampleTask {
    title: &'static str,
    description: &'static str,
    priority: Priority,
    completed: bool,
}

const SAMPLE_TASKS: [SampleTask; 8] = [
    SampleTask {
        title: "🎉 Welcome to your task tracker!",
        description: "This is a sample task to help you get started. You can delete all sample tasks and create your own!",
        priority: Priority::High,
        completed: false,
    },
    SampleTask {
        title: "✨ Create your first real task",
        description: "Add your own tasks with the + button. Delete this sample when ready!",
        priority: Priority::Medium,
        completed: false,
    },
    SampleTask {
        title: "📊 Explore the analytics dashboard",
        description: "Open 'Analytics' to see your productivity charts and insights.",
        priority: Priority::Medium,
        completed: false,
    },
    SampleTask {
        title: "🏷️ Try organizing with categories",
        description: "Add categories to your tasks to group them. You can edit or delete this example.",
        priority: Priority::Low,
        completed: false,
    },
    SampleTask {
        title: "📝 Edit a task",
        description: "Any task can be edited after creation. This is a sample you can delete.",
        priority: Priority::Low,
        completed: false,
    },
    SampleTask {
        title: "✅ This is a completed sample task",
        description: "Completed tasks can be filtered and cleared. Delete when ready!",
        priority: Priority::Medium,
        completed: true,
    },
    SampleTask {
        title: "🎯 High priority sample task",
        description: "This shows how high priority tasks appear. Feel free to delete all sample data!",
        priority: Priority::High,
        completed: true,
    },
    SampleTask {
        title: "🗑️ Delete sample tasks when ready",
        description: "All of these samples can be removed at once with 'Clear samples'.",
        priority: Priority::Low,
        completed: true,
    },
];

/// Builds the sample set for `owner`.
///
/// Creation times are spread one per day over the past eight days; the
/// completed ones are stamped in twelve-hour steps so they show up in the
/// analytics charts.
pub fn sample_tasks(owner: Uuid, now: DateTime<Utc>) -> Vec<Task> {
    let total = SAMPLE_TASKS.len() as i64;
    SAMPLE_TASKS
        .iter()
        .enumerate()
        .map(|(index, sample)| {
            let index = index as i64;
            let created_at = now - Duration::days(total - index);
            let completed_at = sample
                .completed
                .then(|| now - Duration::hours((total - index - 1) * 12));
            Task {
                id: Uuid::new_v4(),
                owner_id: owner,
                title: sample.title.to_string(),
                description: Some(sample.description.to_string()),
                completed: sample.completed,
                priority: sample.priority,
                category: Some(SAMPLE_CATEGORY.to_string()),
                due_date: None,
                created_at,
                updated_at: completed_at.unwrap_or(created_at),
                completed_at,
            }
        })
        .collect()
}

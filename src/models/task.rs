use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use validator::Validate;

/// Represents the status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Todo,
    /// Task is currently being worked on.
    InProgress,
    /// Task is completed.
    Done,
}

impl TaskStatus {
    /// Parses the wire name of a status. Anything else yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a task. The due date stays raw text until the task manager parses it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task.
    /// Must be between 1 and 100 characters.
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    /// An optional description for the task.
    /// Maximum length of 500 characters if provided.
    #[validate(length(max = 500))]
    pub description: Option<String>,

    /// Optional due date in any format accepted by `dates::parse_due_date`.
    pub due_date: Option<String>,
}

/// Input for a partial update. `None` and empty strings leave the stored value alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(length(max = 100))]
    pub title: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    /// Applied only when it names a valid status.
    pub status: Option<String>,
    /// Applied only when it parses to a present date.
    pub due_date: Option<String>,
}

/// A validated task ready to be persisted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: i64,
    /// Identifier of the user who owns the task. Never changes after creation.
    pub user_id: i64,
    /// The title of the task.
    pub title: String,
    /// An optional description for the task.
    pub description: Option<String>,
    /// The current status of the task.
    pub status: TaskStatus,
    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds the stored form of a `NewTask` once the store has assigned an id.
    pub fn from_new(id: i64, new: NewTask) -> Self {
        Self {
            id,
            user_id: new.user_id,
            title: new.title,
            description: new.description,
            status: new.status,
            due_date: new.due_date,
            created_at: new.created_at,
            updated_at: new.updated_at,
        }
    }
}

/// Represents query parameters for listing tasks.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Filter tasks by status name; empty or absent lists all.
    pub status: Option<String>,
    /// 1-based page number.
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// One page of a user's tasks plus the total number of matching tasks.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskPage {
    pub items: Vec<Task>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

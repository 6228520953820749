/// Task model
///
/// Tasks are the cards on a project's Kanban board. Each task sits in one
/// column, identified by `(project_id, status)`, at a zero-based `position`.
/// Positions inside a column are always dense: `0..N-1` with no gaps and no
/// duplicates. Every write that moves a task between or within columns goes
/// through [`crate::services::positions`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'review', 'done');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(300) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date DATE,
///     position INTEGER NOT NULL CHECK (position >= 0),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tasks_column_position_key UNIQUE (project_id, status, position)
///         DEFERRABLE INITIALLY DEFERRED
/// );
/// ```
///
/// # Display order
///
/// Lists are ordered by `position` ascending, then `created_at` descending.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kanban column a task sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    Todo,

    /// Being worked on
    InProgress,

    /// Waiting for review
    Review,

    /// Finished
    Done,
}

impl TaskStatus {
    /// Every column, in board order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];

    /// Converts status to its wire/database name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }

    /// Parses a wire name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "review" => Some(TaskStatus::Review),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Every priority, lowest first
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    /// Converts priority to its wire/database name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }

    /// Parses a wire name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            "urgent" => Some(TaskPriority::Urgent),
            _ => None,
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Short title
    pub title: String,

    /// Longer description
    pub description: String,

    /// User who created the task (null if that user was deleted)
    pub created_by: Option<Uuid>,

    /// Assigned user
    pub assignee_id: Option<Uuid>,

    /// Column
    pub status: TaskStatus,

    /// Priority
    pub priority: TaskPriority,

    /// Optional due date
    pub due_date: Option<NaiveDate>,

    /// Zero-based position within `(project_id, status)`
    pub position: i32,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Due before `today` and not done
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Done && self.due_date.map_or(false, |due| due < today)
    }
}

/// Input for creating a task
///
/// `position` is not accepted: new tasks always land at the end of their
/// column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    /// Title
    pub title: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Initial column
    #[serde(default)]
    pub status: TaskStatus,

    /// Priority
    #[serde(default)]
    pub priority: TaskPriority,

    /// Due date
    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    /// Initial assignee
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
}

impl CreateTask {
    /// Input for a task in `todo` with medium priority and nothing else set
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update of a task's plain fields
///
/// Status, assignee and position are changed through their own operations.
/// `due_date: Some(None)` clears the due date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    #[serde(default, with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl UpdateTask {
    /// Applies the update to `task` and returns the names of the fields
    /// whose value actually changed
    pub fn apply_to(&self, task: &mut Task) -> Vec<&'static str> {
        let mut changes = Vec::new();

        if let Some(title) = &self.title {
            if *title != task.title {
                task.title = title.clone();
                changes.push("title");
            }
        }
        if let Some(description) = &self.description {
            if *description != task.description {
                task.description = description.clone();
                changes.push("description");
            }
        }
        if let Some(priority) = self.priority {
            if priority != task.priority {
                task.priority = priority;
                changes.push("priority");
            }
        }
        if let Some(due_date) = self.due_date {
            if due_date != task.due_date {
                task.due_date = due_date;
                changes.push("due_date");
            }
        }

        changes
    }
}

/// Distinguishes an absent field from an explicit `null`
pub mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Assignee selector in a task filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeFilter {
    /// The requesting user
    Me,

    /// A specific user
    User(Uuid),
}

impl AssigneeFilter {
    /// Parses `me` or a UUID
    pub fn parse(value: &str) -> Option<Self> {
        if value == "me" {
            return Some(AssigneeFilter::Me);
        }
        Uuid::parse_str(value).ok().map(AssigneeFilter::User)
    }
}

/// Task list filter
///
/// All set criteria must match. An empty filter matches every task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Exact column
    pub status: Option<TaskStatus>,

    /// Any of these priorities
    pub priorities: Vec<TaskPriority>,

    /// Assigned to this user
    pub assignee: Option<AssigneeFilter>,

    /// Only tasks with no assignee
    pub unassigned: bool,

    /// Case-insensitive substring of title or description
    pub search: Option<String>,

    /// Due on or before this date
    pub due_before: Option<NaiveDate>,

    /// Due on or after this date
    pub due_after: Option<NaiveDate>,

    /// Due before today and not done
    pub overdue: bool,

    /// Due between today and the coming Sunday
    pub due_this_week: bool,
}

impl TaskFilter {
    /// Returns true if `task` passes every criterion
    ///
    /// # Arguments
    ///
    /// * `task` - Candidate task
    /// * `actor` - Requesting user, resolves [`AssigneeFilter::Me`]
    /// * `today` - Reference date for `overdue` and `due_this_week`
    pub fn matches(&self, task: &Task, actor: Uuid, today: NaiveDate) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }

        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }

        if let Some(assignee) = self.assignee {
            let wanted = match assignee {
                AssigneeFilter::Me => actor,
                AssigneeFilter::User(id) => id,
            };
            if task.assignee_id != Some(wanted) {
                return false;
            }
        }

        if self.unassigned && task.assignee_id.is_some() {
            return false;
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !task.title.to_lowercase().contains(&needle)
                && !task.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if let Some(before) = self.due_before {
            if !task.due_date.map_or(false, |due| due <= before) {
                return false;
            }
        }

        if let Some(after) = self.due_after {
            if !task.due_date.map_or(false, |due| due >= after) {
                return false;
            }
        }

        if self.overdue && !task.is_overdue(today) {
            return false;
        }

        if self.due_this_week {
            let week_end = end_of_week(today);
            if !task.due_date.map_or(false, |due| due >= today && due <= week_end) {
                return false;
            }
        }

        true
    }
}

/// Sunday of the week containing `day`
fn end_of_week(day: NaiveDate) -> NaiveDate {
    use chrono::{Datelike, Duration};

    let days_left = 6 - i64::from(day.weekday().num_days_from_monday());
    day + Duration::days(days_left)
}

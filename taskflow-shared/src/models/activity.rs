/// Activity model
///
/// Append-only audit records of state changes inside a project. Rows are
/// written by [`crate::services::activity::record`] in the same transaction
/// as the change they describe, and are never updated or deleted by the
/// application.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE activity_kind AS ENUM (
///     'task_created', 'task_updated', 'task_deleted', 'task_status_changed',
///     'task_assigned', 'task_unassigned', 'comment_added', 'comment_deleted',
///     'label_added', 'label_removed', 'member_joined', 'member_left',
///     'project_updated'
/// );
///
/// CREATE TABLE activities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     task_id UUID REFERENCES tasks(id) ON DELETE SET NULL,
///     kind activity_kind NOT NULL,
///     description VARCHAR(500) NOT NULL,
///     details JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
/// );
/// ```
///
/// `created_at` uses `clock_timestamp()` so several rows written by one
/// transaction still sort in write order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Kind of recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    TaskStatusChanged,
    TaskAssigned,
    TaskUnassigned,
    CommentAdded,
    CommentDeleted,
    LabelAdded,
    LabelRemoved,
    MemberJoined,
    MemberLeft,
    ProjectUpdated,
}

impl ActivityKind {
    /// Converts kind to its wire/database name
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::TaskCreated => "task_created",
            ActivityKind::TaskUpdated => "task_updated",
            ActivityKind::TaskDeleted => "task_deleted",
            ActivityKind::TaskStatusChanged => "task_status_changed",
            ActivityKind::TaskAssigned => "task_assigned",
            ActivityKind::TaskUnassigned => "task_unassigned",
            ActivityKind::CommentAdded => "comment_added",
            ActivityKind::CommentDeleted => "comment_deleted",
            ActivityKind::LabelAdded => "label_added",
            ActivityKind::LabelRemoved => "label_removed",
            ActivityKind::MemberJoined => "member_joined",
            ActivityKind::MemberLeft => "member_left",
            ActivityKind::ProjectUpdated => "project_updated",
        }
    }

    /// Parses a wire name
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "task_created" => Some(ActivityKind::TaskCreated),
            "task_updated" => Some(ActivityKind::TaskUpdated),
            "task_deleted" => Some(ActivityKind::TaskDeleted),
            "task_status_changed" => Some(ActivityKind::TaskStatusChanged),
            "task_assigned" => Some(ActivityKind::TaskAssigned),
            "task_unassigned" => Some(ActivityKind::TaskUnassigned),
            "comment_added" => Some(ActivityKind::CommentAdded),
            "comment_deleted" => Some(ActivityKind::CommentDeleted),
            "label_added" => Some(ActivityKind::LabelAdded),
            "label_removed" => Some(ActivityKind::LabelRemoved),
            "member_joined" => Some(ActivityKind::MemberJoined),
            "member_left" => Some(ActivityKind::MemberLeft),
            "project_updated" => Some(ActivityKind::ProjectUpdated),
            _ => None,
        }
    }
}

/// Activity model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    /// Unique activity ID
    pub id: Uuid,

    /// Acting user (null once that user is deleted)
    pub user_id: Option<Uuid>,

    /// Project the action happened in
    pub project_id: Uuid,

    /// Related task (null once that task is deleted)
    pub task_id: Option<Uuid>,

    /// Action kind
    pub kind: ActivityKind,

    /// Human-readable summary
    pub description: String,

    /// Structured payload (JSON object)
    pub details: JsonValue,

    /// When the action was recorded
    pub created_at: DateTime<Utc>,
}

/// Input for recording an activity
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub user_id: Option<Uuid>,
    pub project_id: Uuid,
    pub task_id: Option<Uuid>,
    pub kind: ActivityKind,
    pub description: String,
    pub details: JsonValue,
}

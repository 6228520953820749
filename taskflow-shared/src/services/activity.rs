//! Activity log
//!
//! [`record`] writes one activity row through the caller's transaction, so
//! the row commits or rolls back together with the change it describes.
//! The builder functions below produce the [`NewActivity`] for each kind of
//! event with a consistent description and details payload.

use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::activity::{Activity, ActivityKind, NewActivity};
use crate::models::comment::Comment;
use crate::models::label::Label;
use crate::models::project::Project;
use crate::models::task::{Task, TaskStatus};
use crate::models::user::User;
use crate::store::StoreTx;

/// Feed size when the caller does not ask for one
pub const DEFAULT_FEED_LIMIT: i64 = 50;

/// Largest feed page a caller may request
pub const MAX_FEED_LIMIT: i64 = 100;

/// Appends an activity row inside `tx`
///
/// # Errors
///
/// Returns a store error; the caller's transaction must then be abandoned.
pub async fn record(tx: &mut dyn StoreTx, new: NewActivity) -> CoreResult<Activity> {
    let mut activity = Activity {
        id: Uuid::new_v4(),
        user_id: new.user_id,
        project_id: new.project_id,
        task_id: new.task_id,
        kind: new.kind,
        description: new.description,
        details: new.details,
        created_at: Utc::now(),
    };

    activity.created_at = tx.insert_activity(&activity).await?;

    debug!(
        project_id = %activity.project_id,
        kind = activity.kind.as_str(),
        "Recorded activity"
    );
    Ok(activity)
}

/// Clamps a requested page size to `1..=MAX_FEED_LIMIT`
pub fn feed_limit(requested: Option<i64>, default: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, MAX_FEED_LIMIT)
}

fn new(
    actor: Uuid,
    project_id: Uuid,
    task_id: Option<Uuid>,
    kind: ActivityKind,
    description: String,
    details: JsonValue,
) -> NewActivity {
    NewActivity {
        user_id: Some(actor),
        project_id,
        task_id,
        kind,
        description,
        details,
    }
}

pub fn task_created(actor: Uuid, task: &Task) -> NewActivity {
    new(
        actor,
        task.project_id,
        Some(task.id),
        ActivityKind::TaskCreated,
        format!("created task \"{}\"", task.title),
        json!({}),
    )
}

/// `changes` lists the names of the fields that changed
pub fn task_updated(actor: Uuid, task: &Task, changes: &[&str]) -> NewActivity {
    new(
        actor,
        task.project_id,
        Some(task.id),
        ActivityKind::TaskUpdated,
        format!("updated task \"{}\"", task.title),
        json!({ "changes": changes }),
    )
}

/// The task row is gone, so only its title is kept
pub fn task_deleted(actor: Uuid, task: &Task) -> NewActivity {
    new(
        actor,
        task.project_id,
        None,
        ActivityKind::TaskDeleted,
        format!("deleted task \"{}\"", task.title),
        json!({ "task_id": task.id, "title": task.title }),
    )
}

pub fn status_changed(
    actor: Uuid,
    task: &Task,
    old_status: TaskStatus,
    new_status: TaskStatus,
) -> NewActivity {
    new(
        actor,
        task.project_id,
        Some(task.id),
        ActivityKind::TaskStatusChanged,
        format!("changed \"{}\" from {} to {}", task.title, old_status, new_status),
        json!({ "old_status": old_status, "new_status": new_status }),
    )
}

pub fn task_assigned(actor: Uuid, task: &Task, assignee: &User) -> NewActivity {
    new(
        actor,
        task.project_id,
        Some(task.id),
        ActivityKind::TaskAssigned,
        format!("assigned \"{}\" to {}", task.title, assignee.email),
        json!({ "assignee_id": assignee.id, "assignee_email": assignee.email }),
    )
}

pub fn task_unassigned(actor: Uuid, task: &Task, previous: Option<Uuid>) -> NewActivity {
    new(
        actor,
        task.project_id,
        Some(task.id),
        ActivityKind::TaskUnassigned,
        format!("unassigned \"{}\"", task.title),
        json!({ "previous_assignee_id": previous }),
    )
}

pub fn comment_added(actor: Uuid, task: &Task, comment: &Comment) -> NewActivity {
    new(
        actor,
        task.project_id,
        Some(task.id),
        ActivityKind::CommentAdded,
        format!("commented on \"{}\"", task.title),
        json!({ "comment_id": comment.id }),
    )
}

pub fn comment_deleted(actor: Uuid, task: &Task, comment: &Comment) -> NewActivity {
    new(
        actor,
        task.project_id,
        Some(task.id),
        ActivityKind::CommentDeleted,
        format!("deleted a comment on \"{}\"", task.title),
        json!({ "comment_id": comment.id }),
    )
}

pub fn label_added(actor: Uuid, task: &Task, label: &Label) -> NewActivity {
    new(
        actor,
        task.project_id,
        Some(task.id),
        ActivityKind::LabelAdded,
        format!("added label {} to \"{}\"", label.name, task.title),
        json!({ "label_id": label.id, "label": label.name }),
    )
}

pub fn label_removed(actor: Uuid, task: &Task, label: &Label) -> NewActivity {
    new(
        actor,
        task.project_id,
        Some(task.id),
        ActivityKind::LabelRemoved,
        format!("removed label {} from \"{}\"", label.name, task.title),
        json!({ "label_id": label.id, "label": label.name }),
    )
}

pub fn member_joined(actor: Uuid, project: &Project, member: &User, role: &str) -> NewActivity {
    new(
        actor,
        project.id,
        None,
        ActivityKind::MemberJoined,
        format!("{} joined the project", member.email),
        json!({ "user_id": member.id, "email": member.email, "role": role }),
    )
}

pub fn member_left(actor: Uuid, project: &Project, member: &User) -> NewActivity {
    new(
        actor,
        project.id,
        None,
        ActivityKind::MemberLeft,
        format!("{} left the project", member.email),
        json!({ "user_id": member.id, "email": member.email }),
    )
}

pub fn project_updated(actor: Uuid, project: &Project, changes: &[&str]) -> NewActivity {
    new(
        actor,
        project.id,
        None,
        ActivityKind::ProjectUpdated,
        format!("updated project \"{}\"", project.name),
        json!({ "changes": changes }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskPriority;

    fn task() -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Ship it".to_string(),
            description: String::new(),
            created_by: None,
            assignee_id: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
            due_date: None,
            position: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_feed_limit_clamps() {
        assert_eq!(feed_limit(None, DEFAULT_FEED_LIMIT), 50);
        assert_eq!(feed_limit(Some(10), DEFAULT_FEED_LIMIT), 10);
        assert_eq!(feed_limit(Some(0), DEFAULT_FEED_LIMIT), 1);
        assert_eq!(feed_limit(Some(-5), DEFAULT_FEED_LIMIT), 1);
        assert_eq!(feed_limit(Some(10_000), DEFAULT_FEED_LIMIT), MAX_FEED_LIMIT);
    }

    #[test]
    fn test_status_changed_details() {
        let t = task();
        let entry = status_changed(Uuid::new_v4(), &t, TaskStatus::Todo, TaskStatus::InProgress);

        assert_eq!(entry.kind, ActivityKind::TaskStatusChanged);
        assert_eq!(entry.task_id, Some(t.id));
        assert_eq!(entry.details["old_status"], "todo");
        assert_eq!(entry.details["new_status"], "in_progress");
        assert_eq!(entry.description, "changed \"Ship it\" from todo to in_progress");
    }

    #[test]
    fn test_task_updated_lists_field_names_only() {
        let t = task();
        let entry = task_updated(Uuid::new_v4(), &t, &["title", "due_date"]);
        assert_eq!(entry.details, json!({ "changes": ["title", "due_date"] }));
    }

    #[test]
    fn test_task_deleted_has_no_task_reference() {
        let t = task();
        let entry = task_deleted(Uuid::new_v4(), &t);
        assert_eq!(entry.task_id, None);
        assert_eq!(entry.details["title"], "Ship it");
    }
}

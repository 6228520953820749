//! Task operations
//!
//! Every operation that changes a task's column or position takes the
//! project's board lock first (see [`super::lock_task`]) and goes through
//! [`super::positions`], so columns stay dense on every path: create,
//! reorder, status change and delete.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::activity;
use super::positions::{append_position, close_gap, move_task};
use super::{check, load_project, load_task, lock_task};
use crate::auth::authorization::{Action, PolicyInput};
use crate::auth::resolver::resolve_role;
use crate::error::{CoreError, CoreResult};
use crate::models::comment::Comment;
use crate::models::label::Label;
use crate::models::project::Project;
use crate::models::task::{CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask};
use crate::models::user::User;
use crate::store::StoreTx;

/// Task with its labels and comments
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub labels: Vec<Label>,
    pub comments: Vec<Comment>,
}

/// Task counts of one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub total: usize,
    pub by_priority: BTreeMap<TaskPriority, usize>,
    pub by_status: BTreeMap<TaskStatus, usize>,

    /// Due before today and not done
    pub overdue: usize,
}

/// Checks that `user_id` may hold tasks in `project` and loads the user
///
/// # Errors
///
/// - [`CoreError::NotFound`] if the user does not exist
/// - [`CoreError::Validation`] if the user has no role in the project
async fn assignable_user(
    tx: &mut dyn StoreTx,
    project: &Project,
    user_id: Uuid,
) -> CoreResult<User> {
    let user = tx
        .find_user(user_id)
        .await?
        .ok_or(CoreError::NotFound("user"))?;

    if resolve_role(tx, user_id, project).await?.is_none() {
        return Err(CoreError::Validation(
            "assignee must be a member of the project".to_string(),
        ));
    }
    Ok(user)
}

/// Creates a task at the end of its initial column
pub async fn create_task(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
    input: CreateTask,
) -> CoreResult<Task> {
    let project = tx
        .lock_project(project_id)
        .await?
        .ok_or(CoreError::NotFound("project"))?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::CreateTask, &PolicyInput::new(actor, role), "project")?;

    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(CoreError::Validation("title is required".to_string()));
    }

    let assignee = match input.assignee_id {
        Some(assignee_id) => {
            check(
                Action::AssignTask,
                &PolicyInput::new(actor, role).with_assignee(Some(assignee_id)),
                "project",
            )?;
            Some(assignable_user(tx, &project, assignee_id).await?)
        }
        None => None,
    };

    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4(),
        project_id: project.id,
        title,
        description: input.description,
        created_by: Some(actor),
        assignee_id: assignee.as_ref().map(|u| u.id),
        status: input.status,
        priority: input.priority,
        due_date: input.due_date,
        position: append_position(tx, project.id, input.status).await?,
        created_at: now,
        updated_at: now,
    };
    tx.insert_task(&task).await?;

    activity::record(tx, activity::task_created(actor, &task)).await?;
    if let Some(user) = &assignee {
        activity::record(tx, activity::task_assigned(actor, &task, user)).await?;
    }

    info!(task_id = %task.id, project_id = %project.id, status = task.status.as_str(), position = task.position, "Task created");
    Ok(task)
}

/// Task with labels and comments
pub async fn get_task(tx: &mut dyn StoreTx, actor: Uuid, task_id: Uuid) -> CoreResult<TaskDetail> {
    let task = load_task(tx, task_id).await?;
    let project = load_project(tx, task.project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::ViewTask, &PolicyInput::new(actor, role).with_task(&task), "task")?;

    let labels = tx.labels_for_task(task.id).await?;
    let comments = tx.list_comments(task.id).await?;
    Ok(TaskDetail {
        task,
        labels,
        comments,
    })
}

/// Tasks of a project matching `filter`, by position then newest first
pub async fn list_tasks(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
    filter: &TaskFilter,
    today: NaiveDate,
) -> CoreResult<Vec<Task>> {
    let project = load_project(tx, project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::ViewProject, &PolicyInput::new(actor, role), "project")?;

    let tasks = tx.list_tasks(project.id).await?;
    let total = tasks.len();
    let tasks: Vec<Task> = tasks
        .into_iter()
        .filter(|task| filter.matches(task, actor, today))
        .collect();

    debug!(project_id = %project.id, total, matched = tasks.len(), "Listed tasks");
    Ok(tasks)
}

/// Updates title, description, priority or due date
///
/// Records TASK_UPDATED with the changed field names, or nothing when no
/// value changed.
pub async fn update_task(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    task_id: Uuid,
    update: UpdateTask,
) -> CoreResult<Task> {
    let mut task = load_task(tx, task_id).await?;
    let project = load_project(tx, task.project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::UpdateTask, &PolicyInput::new(actor, role).with_task(&task), "task")?;

    if let Some(title) = &update.title {
        if title.trim().is_empty() {
            return Err(CoreError::Validation("title is required".to_string()));
        }
    }

    let changes = update.apply_to(&mut task);
    if changes.is_empty() {
        return Ok(task);
    }

    task.updated_at = Utc::now();
    let task = tx
        .update_task_fields(&task)
        .await?
        .ok_or(CoreError::NotFound("task"))?;
    activity::record(tx, activity::task_updated(actor, &task, &changes)).await?;

    info!(task_id = %task.id, changes = ?changes, "Task updated");
    Ok(task)
}

/// Deletes a task and closes the gap in its column
pub async fn delete_task(tx: &mut dyn StoreTx, actor: Uuid, task_id: Uuid) -> CoreResult<()> {
    let (project, task) = lock_task(tx, task_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::DeleteTask, &PolicyInput::new(actor, role).with_task(&task), "task")?;

    tx.delete_task(task.id).await?;
    close_gap(tx, task.project_id, task.status, task.position).await?;
    activity::record(tx, activity::task_deleted(actor, &task)).await?;

    info!(task_id = %task.id, project_id = %project.id, "Task deleted");
    Ok(())
}

/// Moves a task to `(status, position)` on the board
///
/// Positions past the end of the target column are clamped to it. A move
/// to another column is also a status change and needs that permission
/// too. Resubmitting the current slot writes nothing.
pub async fn reorder_task(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    task_id: Uuid,
    status: TaskStatus,
    position: i32,
) -> CoreResult<Task> {
    let (project, mut task) = lock_task(tx, task_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    let input = PolicyInput::new(actor, role).with_task(&task);
    check(Action::ReorderTask, &input, "task")?;

    let old_status = task.status;
    if old_status != status {
        check(Action::ChangeStatus, &input, "task")?;
    }

    if move_task(tx, &mut task, status, position).await? {
        if old_status != status {
            activity::record(tx, activity::status_changed(actor, &task, old_status, status)).await?;
        }
        info!(task_id = %task.id, status = status.as_str(), position = task.position, "Task reordered");
    }
    Ok(task)
}

/// Changes a task's column, placing it at the end of the new column
pub async fn change_status(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    task_id: Uuid,
    status: TaskStatus,
) -> CoreResult<Task> {
    let (project, mut task) = lock_task(tx, task_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::ChangeStatus, &PolicyInput::new(actor, role).with_task(&task), "task")?;

    let old_status = task.status;
    if old_status == status {
        return Ok(task);
    }

    let end = append_position(tx, task.project_id, status).await?;
    move_task(tx, &mut task, status, end).await?;
    activity::record(tx, activity::status_changed(actor, &task, old_status, status)).await?;

    info!(task_id = %task.id, from = old_status.as_str(), to = status.as_str(), "Task status changed");
    Ok(task)
}

/// Assigns a task to `assignee`, or clears the assignment with `None`
///
/// # Errors
///
/// - [`CoreError::Forbidden`] when a plain member assigns someone else
/// - [`CoreError::NotFound`] when the assignee does not exist
/// - [`CoreError::Validation`] when the assignee is not in the project
pub async fn assign_task(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    task_id: Uuid,
    assignee: Option<Uuid>,
) -> CoreResult<Task> {
    let task = load_task(tx, task_id).await?;
    let project = load_project(tx, task.project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(
        Action::AssignTask,
        &PolicyInput::new(actor, role)
            .with_task(&task)
            .with_assignee(assignee),
        "task",
    )?;

    if task.assignee_id == assignee {
        return Ok(task);
    }

    let previous = task.assignee_id;
    let assignee = match assignee {
        Some(user_id) => Some(assignable_user(tx, &project, user_id).await?),
        None => None,
    };

    let task = tx
        .set_task_assignee(task.id, assignee.as_ref().map(|u| u.id), Utc::now())
        .await?
        .ok_or(CoreError::NotFound("task"))?;
    let entry = match &assignee {
        Some(user) => activity::task_assigned(actor, &task, user),
        None => activity::task_unassigned(actor, &task, previous),
    };
    activity::record(tx, entry).await?;

    info!(task_id = %task.id, assignee = ?task.assignee_id, "Task assignment changed");
    Ok(task)
}

/// Counts a project's tasks by priority and status, plus overdue tasks
pub async fn project_summary(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
    today: NaiveDate,
) -> CoreResult<ProjectSummary> {
    let project = load_project(tx, project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::ViewSummary, &PolicyInput::new(actor, role), "project")?;

    let tasks = tx.list_tasks(project.id).await?;
    let mut summary = ProjectSummary {
        total: tasks.len(),
        by_priority: TaskPriority::ALL.iter().map(|p| (*p, 0)).collect(),
        by_status: TaskStatus::ALL.iter().map(|s| (*s, 0)).collect(),
        overdue: 0,
    };

    for task in &tasks {
        *summary.by_priority.entry(task.priority).or_default() += 1;
        *summary.by_status.entry(task.status).or_default() += 1;
        if task.is_overdue(today) {
            summary.overdue += 1;
        }
    }
    Ok(summary)
}

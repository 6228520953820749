//! Project labels and task tagging
//!
//! Labels belong to one project and can only be attached to tasks of that
//! project. A label from another project is reported as not found.

use tracing::info;
use uuid::Uuid;

use super::activity;
use super::{check, load_project, load_task};
use crate::auth::authorization::{Action, PolicyInput};
use crate::auth::resolver::resolve_role;
use crate::error::{CoreError, CoreResult};
use crate::models::label::{CreateLabel, Label, UpdateLabel, DEFAULT_LABEL_COLOR};
use crate::models::project::Project;
use crate::models::task::Task;
use crate::store::StoreTx;

fn require_name(name: &str) -> CoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("label name is required".to_string()));
    }
    Ok(name.to_string())
}

async fn load_label(tx: &mut dyn StoreTx, label_id: Uuid) -> CoreResult<Label> {
    tx.find_label(label_id)
        .await?
        .ok_or(CoreError::NotFound("label"))
}

/// Loads a task with its project and checks `action`
async fn authorized_task(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    task_id: Uuid,
    action: Action,
) -> CoreResult<(Project, Task)> {
    let task = load_task(tx, task_id).await?;
    let project = load_project(tx, task.project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(action, &PolicyInput::new(actor, role).with_task(&task), "task")?;
    Ok((project, task))
}

/// Loads a label that must belong to `project`
async fn project_label(tx: &mut dyn StoreTx, project: &Project, label_id: Uuid) -> CoreResult<Label> {
    let label = load_label(tx, label_id).await?;
    if label.project_id != project.id {
        return Err(CoreError::NotFound("label"));
    }
    Ok(label)
}

/// Labels of a project ordered by name
pub async fn list_labels(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
) -> CoreResult<Vec<Label>> {
    let project = load_project(tx, project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::ViewProject, &PolicyInput::new(actor, role), "project")?;

    Ok(tx.list_labels(project.id).await?)
}

/// Creates a label; names are unique per project
pub async fn create_label(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
    input: CreateLabel,
) -> CoreResult<Label> {
    let project = load_project(tx, project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::ManageLabels, &PolicyInput::new(actor, role), "project")?;

    let label = Label {
        id: Uuid::new_v4(),
        project_id: project.id,
        name: require_name(&input.name)?,
        color: input
            .color
            .unwrap_or_else(|| DEFAULT_LABEL_COLOR.to_string()),
    };
    tx.insert_label(&label).await?;

    info!(label_id = %label.id, project_id = %project.id, "Label created");
    Ok(label)
}

pub async fn update_label(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    label_id: Uuid,
    mut update: UpdateLabel,
) -> CoreResult<Label> {
    let mut label = load_label(tx, label_id).await?;
    let project = load_project(tx, label.project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::ManageLabels, &PolicyInput::new(actor, role), "label")?;

    if let Some(name) = update.name.take() {
        update.name = Some(require_name(&name)?);
    }

    if update.apply_to(&mut label) {
        tx.update_label(&label).await?;
    }
    Ok(label)
}

/// Deletes a label and detaches it from every task
pub async fn delete_label(tx: &mut dyn StoreTx, actor: Uuid, label_id: Uuid) -> CoreResult<()> {
    let label = load_label(tx, label_id).await?;
    let project = load_project(tx, label.project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::ManageLabels, &PolicyInput::new(actor, role), "label")?;

    tx.delete_label(label.id).await?;

    info!(label_id = %label.id, project_id = %project.id, "Label deleted");
    Ok(())
}

/// Attaches a label of the task's project to the task
///
/// Records LABEL_ADDED only when the label was not attached yet.
pub async fn attach_label(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    task_id: Uuid,
    label_id: Uuid,
) -> CoreResult<Vec<Label>> {
    let (project, task) = authorized_task(tx, actor, task_id, Action::TagTask).await?;
    let label = project_label(tx, &project, label_id).await?;

    if tx.attach_label(task.id, label.id).await? {
        activity::record(tx, activity::label_added(actor, &task, &label)).await?;
        info!(task_id = %task.id, label_id = %label.id, "Label attached");
    }
    Ok(tx.labels_for_task(task.id).await?)
}

/// Detaches a label from the task
///
/// Records LABEL_REMOVED only when the label was attached.
pub async fn detach_label(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    task_id: Uuid,
    label_id: Uuid,
) -> CoreResult<Vec<Label>> {
    let (project, task) = authorized_task(tx, actor, task_id, Action::TagTask).await?;
    let label = project_label(tx, &project, label_id).await?;

    if tx.detach_label(task.id, label.id).await? {
        activity::record(tx, activity::label_removed(actor, &task, &label)).await?;
        info!(task_id = %task.id, label_id = %label.id, "Label detached");
    }
    Ok(tx.labels_for_task(task.id).await?)
}

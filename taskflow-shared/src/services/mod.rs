//! Domain services
//!
//! Each public operation takes the acting user and a `&mut dyn StoreTx`
//! opened by the caller. The sequence is always the same: load the target by
//! id (not-found first), resolve the actor's role, authorize, mutate,
//! re-pack positions if needed, record activity. The caller commits.
//!
//! - `activity`: Activity log writes and feed limits
//! - `positions`: Dense column ordering
//! - `projects`: Projects and memberships
//! - `tasks`: Task lifecycle, reorder, assignment and status
//! - `comments`: Task comments
//! - `labels`: Project labels and task tagging
//! - `users`: User records

pub mod activity;
pub mod comments;
pub mod labels;
pub mod positions;
pub mod projects;
pub mod tasks;
pub mod users;

use tracing::warn;
use uuid::Uuid;

use crate::auth::authorization::{authorize, Action, AuthzError, PolicyInput};
use crate::error::{CoreError, CoreResult};
use crate::models::project::Project;
use crate::models::task::Task;
use crate::store::StoreTx;

/// Runs the policy for `action`, mapping a missing role to not-found of
/// `entity`
pub(crate) fn check(action: Action, input: &PolicyInput<'_>, entity: &'static str) -> CoreResult<()> {
    authorize(action, input).map_err(|err| {
        warn!(actor = %input.actor, action = ?action, error = %err, "Action denied");
        match err {
            AuthzError::NotMember => CoreError::NotFound(entity),
            AuthzError::Denied { .. } => CoreError::Forbidden(err.to_string()),
        }
    })
}

pub(crate) async fn load_project(tx: &mut dyn StoreTx, id: Uuid) -> CoreResult<Project> {
    tx.find_project(id)
        .await?
        .ok_or(CoreError::NotFound("project"))
}

pub(crate) async fn load_task(tx: &mut dyn StoreTx, id: Uuid) -> CoreResult<Task> {
    tx.find_task(id).await?.ok_or(CoreError::NotFound("task"))
}

/// Takes the board lock of the task's project and re-reads the task
///
/// Returns the locked project and the fresh task row.
pub(crate) async fn lock_task(tx: &mut dyn StoreTx, id: Uuid) -> CoreResult<(Project, Task)> {
    let task = load_task(tx, id).await?;
    let project = tx
        .lock_project(task.project_id)
        .await?
        .ok_or(CoreError::NotFound("task"))?;
    let task = tx
        .find_task_for_update(id)
        .await?
        .ok_or(CoreError::NotFound("task"))?;
    Ok((project, task))
}

//! Task comments
//!
//! Any project role may read and add comments. Only the author edits a
//! comment; the author, the owner or an admin may delete it.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::activity;
use super::{check, load_project, load_task};
use crate::auth::authorization::{Action, PolicyInput};
use crate::auth::resolver::resolve_role;
use crate::error::{CoreError, CoreResult};
use crate::models::comment::Comment;
use crate::models::membership::Role;
use crate::models::task::Task;
use crate::store::StoreTx;

fn require_content(content: &str) -> CoreResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CoreError::Validation("comment cannot be empty".to_string()));
    }
    Ok(content.to_string())
}

/// Loads a comment with its task and the actor's role in the task's project
async fn load_comment(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    comment_id: Uuid,
) -> CoreResult<(Comment, Task, Option<Role>)> {
    let comment = tx
        .find_comment(comment_id)
        .await?
        .ok_or(CoreError::NotFound("comment"))?;
    let task = load_task(tx, comment.task_id).await?;
    let project = load_project(tx, task.project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    Ok((comment, task, role))
}

/// Comments of a task, oldest first
pub async fn list_comments(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    task_id: Uuid,
) -> CoreResult<Vec<Comment>> {
    let task = load_task(tx, task_id).await?;
    let project = load_project(tx, task.project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::ViewTask, &PolicyInput::new(actor, role).with_task(&task), "task")?;

    Ok(tx.list_comments(task.id).await?)
}

pub async fn add_comment(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    task_id: Uuid,
    content: &str,
) -> CoreResult<Comment> {
    let task = load_task(tx, task_id).await?;
    let project = load_project(tx, task.project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(Action::CommentOnTask, &PolicyInput::new(actor, role).with_task(&task), "task")?;

    let now = Utc::now();
    let comment = Comment {
        id: Uuid::new_v4(),
        task_id: task.id,
        user_id: actor,
        content: require_content(content)?,
        created_at: now,
        updated_at: now,
    };
    tx.insert_comment(&comment).await?;
    activity::record(tx, activity::comment_added(actor, &task, &comment)).await?;

    info!(comment_id = %comment.id, task_id = %task.id, "Comment added");
    Ok(comment)
}

/// Replaces the content of the actor's own comment
pub async fn edit_comment(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    comment_id: Uuid,
    content: &str,
) -> CoreResult<Comment> {
    let (mut comment, _task, role) = load_comment(tx, actor, comment_id).await?;
    check(
        Action::EditComment,
        &PolicyInput::new(actor, role).with_comment(&comment),
        "comment",
    )?;

    let content = require_content(content)?;
    if content != comment.content {
        comment.content = content;
        comment.updated_at = Utc::now();
        tx.update_comment(&comment).await?;
    }
    Ok(comment)
}

pub async fn delete_comment(tx: &mut dyn StoreTx, actor: Uuid, comment_id: Uuid) -> CoreResult<()> {
    let (comment, task, role) = load_comment(tx, actor, comment_id).await?;
    check(
        Action::DeleteComment,
        &PolicyInput::new(actor, role).with_comment(&comment),
        "comment",
    )?;

    tx.delete_comment(comment.id).await?;
    activity::record(tx, activity::comment_deleted(actor, &task, &comment)).await?;

    info!(comment_id = %comment.id, task_id = %task.id, "Comment deleted");
    Ok(())
}

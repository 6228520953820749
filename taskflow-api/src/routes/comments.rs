/// Comment endpoints
///
/// - `GET /v1/tasks/:id/comments` - Comments of a task, oldest first
/// - `POST /v1/tasks/:id/comments` - Add a comment (any project role)
/// - `PATCH /v1/comments/:id` - Edit own comment
/// - `DELETE /v1/comments/:id` - Delete (author, owner or admin)

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskflow_shared::{
    auth::middleware::AuthContext, models::comment::Comment, services::comments,
};
use uuid::Uuid;
use validator::Validate;

/// Comment body, used for both create and edit
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 10000, message = "Comment must be 1-10000 characters"))]
    pub content: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
    let mut tx = state.store.begin().await?;
    let list = comments::list_comments(tx.as_mut(), auth.user_id, task_id).await?;
    Ok(Json(list))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    req.validate()?;

    let mut tx = state.store.begin().await?;
    let comment = comments::add_comment(tx.as_mut(), auth.user_id, task_id, &req.content).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<Comment>> {
    req.validate()?;

    let mut tx = state.store.begin().await?;
    let comment = comments::edit_comment(tx.as_mut(), auth.user_id, id, &req.content).await?;
    tx.commit().await?;

    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut tx = state.store.begin().await?;
    comments::delete_comment(tx.as_mut(), auth.user_id, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

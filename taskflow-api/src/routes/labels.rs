/// Label endpoints
///
/// - `GET|POST /v1/projects/:id/labels` - List, create (contributors)
/// - `PATCH|DELETE /v1/labels/:id` - Update, delete (contributors)
/// - `POST|DELETE /v1/tasks/:id/labels` - Attach, detach `{label_id}`
///
/// Attach and detach return the task's labels after the change.

use super::validate_color;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskflow_shared::{
    auth::middleware::AuthContext,
    models::label::{CreateLabel, Label, UpdateLabel},
    services::labels,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLabelRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLabelRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: Option<String>,

    pub color: Option<String>,
}

/// Label attach/detach body
#[derive(Debug, Deserialize)]
pub struct LabelRef {
    pub label_id: Uuid,
}

pub async fn list_labels(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Label>>> {
    let mut tx = state.store.begin().await?;
    let list = labels::list_labels(tx.as_mut(), auth.user_id, project_id).await?;
    Ok(Json(list))
}

/// Create label
///
/// # Errors
///
/// - `409 Conflict`: A label with that name exists in the project
pub async fn create_label(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateLabelRequest>,
) -> ApiResult<(StatusCode, Json<Label>)> {
    req.validate()?;
    validate_color(req.color.as_deref())?;

    let mut tx = state.store.begin().await?;
    let label = labels::create_label(
        tx.as_mut(),
        auth.user_id,
        project_id,
        CreateLabel {
            name: req.name,
            color: req.color,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(label)))
}

pub async fn update_label(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateLabelRequest>,
) -> ApiResult<Json<Label>> {
    req.validate()?;
    validate_color(req.color.as_deref())?;

    let mut tx = state.store.begin().await?;
    let label = labels::update_label(
        tx.as_mut(),
        auth.user_id,
        id,
        UpdateLabel {
            name: req.name,
            color: req.color,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(label))
}

pub async fn delete_label(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut tx = state.store.begin().await?;
    labels::delete_label(tx.as_mut(), auth.user_id, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn attach_label(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<LabelRef>,
) -> ApiResult<Json<Vec<Label>>> {
    let mut tx = state.store.begin().await?;
    let attached = labels::attach_label(tx.as_mut(), auth.user_id, task_id, req.label_id).await?;
    tx.commit().await?;

    Ok(Json(attached))
}

pub async fn detach_label(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<LabelRef>,
) -> ApiResult<Json<Vec<Label>>> {
    let mut tx = state.store.begin().await?;
    let attached = labels::detach_label(tx.as_mut(), auth.user_id, task_id, req.label_id).await?;
    tx.commit().await?;

    Ok(Json(attached))
}

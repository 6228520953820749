/// Project, membership and activity feed endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects` - Projects the caller owns or belongs to
/// - `POST /v1/projects` - Create project
/// - `GET|PATCH|DELETE /v1/projects/:id` - Read, update, delete
/// - `GET /v1/projects/:id/members` - List members
/// - `POST /v1/projects/:id/invite` - Invite a registered user by email
/// - `PATCH|DELETE /v1/projects/:id/members/:user_id` - Change role, remove
/// - `GET /v1/projects/:id/activities?limit=` - Activity feed, newest first

use super::validate_color;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskflow_shared::{
    auth::middleware::AuthContext,
    models::{
        activity::Activity,
        membership::{Membership, MembershipRole},
        project::{CreateProject, Project, ProjectStatus, UpdateProject},
    },
    services::projects::{self, MemberDetail, ProjectView},
};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: String,

    /// Hex color, defaults to the project palette's blue
    pub color: Option<String>,
}

/// Update project request; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub status: Option<ProjectStatus>,

    pub color: Option<String>,
}

/// Invite member request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteMemberRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub role: MembershipRole,
}

/// Change member role request
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: MembershipRole,
}

/// Activity feed query
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Page size, clamped to 1..=100
    pub limit: Option<i64>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ProjectView>>> {
    let mut tx = state.store.begin().await?;
    let views = projects::list_projects(tx.as_mut(), auth.user_id).await?;
    Ok(Json(views))
}

/// Create project
///
/// The caller becomes the owner and gets an admin membership.
///
/// ```text
/// POST /v1/projects
/// {"name": "Website relaunch", "color": "#10b981"}
/// ```
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;
    validate_color(req.color.as_deref())?;

    let mut tx = state.store.begin().await?;
    let project = projects::create_project(
        tx.as_mut(),
        auth.user_id,
        CreateProject {
            name: req.name,
            description: req.description,
            color: req.color,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectView>> {
    let mut tx = state.store.begin().await?;
    let view = projects::get_project(tx.as_mut(), auth.user_id, id).await?;
    Ok(Json(view))
}

/// Update project (owner or admin)
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;
    validate_color(req.color.as_deref())?;

    let mut tx = state.store.begin().await?;
    let project = projects::update_project(
        tx.as_mut(),
        auth.user_id,
        id,
        UpdateProject {
            name: req.name,
            description: req.description,
            status: req.status,
            color: req.color,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(project))
}

/// Delete project (owner only)
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut tx = state.store.begin().await?;
    projects::delete_project(tx.as_mut(), auth.user_id, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberDetail>>> {
    let mut tx = state.store.begin().await?;
    let members = projects::list_members(tx.as_mut(), auth.user_id, id).await?;
    Ok(Json(members))
}

/// Invite a registered user by email (owner or admin)
///
/// # Errors
///
/// - `404 Not Found`: No user with that email
/// - `409 Conflict`: Already a member
pub async fn invite_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<InviteMemberRequest>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    req.validate()?;

    let mut tx = state.store.begin().await?;
    let membership =
        projects::invite_member(tx.as_mut(), auth.user_id, id, &req.email, req.role).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn change_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ChangeRoleRequest>,
) -> ApiResult<Json<Membership>> {
    let mut tx = state.store.begin().await?;
    let membership =
        projects::change_member_role(tx.as_mut(), auth.user_id, id, user_id, req.role).await?;
    tx.commit().await?;

    Ok(Json(membership))
}

/// Remove a member, or leave the project when `user_id` is the caller
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let mut tx = state.store.begin().await?;
    projects::remove_member(tx.as_mut(), auth.user_id, id, user_id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn activity_feed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<Vec<Activity>>> {
    let mut tx = state.store.begin().await?;
    let activities = projects::activity_feed(
        tx.as_mut(),
        auth.user_id,
        id,
        query.limit,
        state.config.activity.default_limit,
    )
    .await?;
    Ok(Json(activities))
}

//! Projects and memberships
//!
//! A project is created together with an `admin` membership for its owner.
//! The owner's row can never be removed or demoted while the project exists.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::activity::{self, feed_limit};
use super::{check, load_project};
use crate::auth::authorization::{Action, PolicyInput};
use crate::auth::resolver::resolve_role;
use crate::error::{CoreError, CoreResult};
use crate::models::activity::Activity;
use crate::models::membership::{Membership, MembershipRole, Role};
use crate::models::project::{CreateProject, Project, UpdateProject, DEFAULT_PROJECT_COLOR};
use crate::models::user::normalize_email;
use crate::store::StoreTx;

/// Project together with the caller's role in it
#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,

    /// Caller's effective role
    pub role: Role,
}

/// Membership joined with the member's user record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberDetail {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: MembershipRole,
    pub is_owner: bool,
    pub joined_at: DateTime<Utc>,
}

/// Loads a project and checks `action` for `actor`
async fn authorized_project(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
    action: Action,
) -> CoreResult<(Project, Role)> {
    let project = load_project(tx, project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(action, &PolicyInput::new(actor, role), "project")?;
    let role = role.ok_or(CoreError::NotFound("project"))?;
    Ok((project, role))
}

/// Creates a project owned by `actor` plus the owner's admin membership
pub async fn create_project(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    input: CreateProject,
) -> CoreResult<Project> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(CoreError::Validation("project name is required".to_string()));
    }

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4(),
        name,
        description: input.description,
        owner_id: actor,
        status: Default::default(),
        color: input
            .color
            .unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
        created_at: now,
        updated_at: now,
    };
    tx.insert_project(&project).await?;

    tx.insert_membership(&Membership {
        project_id: project.id,
        user_id: actor,
        role: MembershipRole::Admin,
        joined_at: now,
    })
    .await?;

    info!(project_id = %project.id, owner_id = %actor, "Project created");
    Ok(project)
}

/// Projects the actor owns or belongs to, newest first
pub async fn list_projects(tx: &mut dyn StoreTx, actor: Uuid) -> CoreResult<Vec<ProjectView>> {
    let projects = tx.list_projects_for_user(actor).await?;

    let mut views = Vec::with_capacity(projects.len());
    for project in projects {
        if let Some(role) = resolve_role(tx, actor, &project).await? {
            views.push(ProjectView { project, role });
        }
    }
    Ok(views)
}

pub async fn get_project(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
) -> CoreResult<ProjectView> {
    let (project, role) = authorized_project(tx, actor, project_id, Action::ViewProject).await?;
    Ok(ProjectView { project, role })
}

/// Applies a partial update; records PROJECT_UPDATED only if a field changed
pub async fn update_project(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
    update: UpdateProject,
) -> CoreResult<Project> {
    let (mut project, _) =
        authorized_project(tx, actor, project_id, Action::UpdateProject).await?;

    if let Some(name) = &update.name {
        if name.trim().is_empty() {
            return Err(CoreError::Validation("project name is required".to_string()));
        }
    }

    let changes = update.apply_to(&mut project);
    if changes.is_empty() {
        return Ok(project);
    }

    project.updated_at = Utc::now();
    tx.update_project(&project).await?;
    activity::record(tx, activity::project_updated(actor, &project, &changes)).await?;

    info!(project_id = %project.id, changes = ?changes, "Project updated");
    Ok(project)
}

/// Deletes a project and everything in it (owner only)
pub async fn delete_project(tx: &mut dyn StoreTx, actor: Uuid, project_id: Uuid) -> CoreResult<()> {
    let (project, _) = authorized_project(tx, actor, project_id, Action::DeleteProject).await?;

    tx.delete_project(project.id).await?;

    info!(project_id = %project.id, "Project deleted");
    Ok(())
}

pub async fn list_members(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
) -> CoreResult<Vec<MemberDetail>> {
    let (project, _) = authorized_project(tx, actor, project_id, Action::ListMembers).await?;

    let memberships = tx.list_memberships(project.id).await?;
    let mut members = Vec::with_capacity(memberships.len());
    for membership in memberships {
        // the user row cascades with its memberships, so it is present
        if let Some(user) = tx.find_user(membership.user_id).await? {
            members.push(MemberDetail {
                user_id: user.id,
                email: user.email,
                display_name: user.display_name,
                role: membership.role,
                is_owner: project.is_owned_by(membership.user_id),
                joined_at: membership.joined_at,
            });
        }
    }
    Ok(members)
}

/// Adds the user registered under `email` to the project
///
/// # Errors
///
/// - [`CoreError::NotFound`] if no user has that email
/// - [`CoreError::Conflict`] if the user is already a member
pub async fn invite_member(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
    email: &str,
    role: MembershipRole,
) -> CoreResult<Membership> {
    let (project, _) = authorized_project(tx, actor, project_id, Action::InviteMember).await?;

    let user = tx
        .find_user_by_email(&normalize_email(email))
        .await?
        .ok_or(CoreError::NotFound("user"))?;

    if project.is_owned_by(user.id) {
        return Err(CoreError::Conflict("user is already a member".to_string()));
    }

    let membership = Membership {
        project_id: project.id,
        user_id: user.id,
        role,
        joined_at: Utc::now(),
    };
    tx.insert_membership(&membership).await?;
    activity::record(
        tx,
        activity::member_joined(actor, &project, &user, role.as_str()),
    )
    .await?;

    info!(project_id = %project.id, user_id = %user.id, role = role.as_str(), "Member invited");
    Ok(membership)
}

/// Changes a member's role; the owner's role is fixed
pub async fn change_member_role(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
    user_id: Uuid,
    role: MembershipRole,
) -> CoreResult<Membership> {
    let (project, _) =
        authorized_project(tx, actor, project_id, Action::ChangeMemberRole).await?;

    if project.is_owned_by(user_id) {
        return Err(CoreError::Validation(
            "the project owner's role cannot be changed".to_string(),
        ));
    }

    let mut membership = tx
        .find_membership(project.id, user_id)
        .await?
        .ok_or(CoreError::NotFound("member"))?;

    if membership.role != role {
        tx.update_membership_role(project.id, user_id, role).await?;
        membership.role = role;
        info!(project_id = %project.id, user_id = %user_id, role = role.as_str(), "Member role changed");
    }
    Ok(membership)
}

/// Removes a member, or lets a member leave
///
/// # Errors
///
/// - [`CoreError::Validation`] when the target is the project owner
/// - [`CoreError::NotFound`] when the target is not a member
pub async fn remove_member(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
    user_id: Uuid,
) -> CoreResult<()> {
    let project = load_project(tx, project_id).await?;
    let role = resolve_role(tx, actor, &project).await?;
    check(
        Action::RemoveMember,
        &PolicyInput::new(actor, role).with_target_user(user_id),
        "project",
    )?;

    if project.is_owned_by(user_id) {
        return Err(CoreError::Validation(
            "the project owner cannot be removed".to_string(),
        ));
    }

    let user = tx
        .find_user(user_id)
        .await?
        .ok_or(CoreError::NotFound("member"))?;
    if !tx.delete_membership(project.id, user_id).await? {
        return Err(CoreError::NotFound("member"));
    }
    activity::record(tx, activity::member_left(actor, &project, &user)).await?;

    info!(project_id = %project.id, user_id = %user_id, "Member removed");
    Ok(())
}

/// Newest activity of a project
///
/// `limit` is clamped to `1..=100`; `None` uses `default_limit`.
pub async fn activity_feed(
    tx: &mut dyn StoreTx,
    actor: Uuid,
    project_id: Uuid,
    limit: Option<i64>,
    default_limit: i64,
) -> CoreResult<Vec<Activity>> {
    let (project, _) = authorized_project(tx, actor, project_id, Action::ViewActivity).await?;
    let activities = tx
        .list_activities(project.id, feed_limit(limit, default_limit))
        .await?;
    Ok(activities)
}

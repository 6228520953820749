//! Membership resolver
//!
//! Computes the [`Role`] a user acts with inside a project. The project
//! owner is always [`Role::Owner`], whatever their membership row says;
//! everyone else gets the role of their membership row, or `None`.

use uuid::Uuid;

use crate::models::membership::{Membership, Role};
use crate::models::project::Project;
use crate::store::{StoreResult, StoreTx};

/// Resolves the effective role of `user_id` in `project`
///
/// `membership` must be the row for `(project.id, user_id)` if one exists.
pub fn resolve(user_id: Uuid, project: &Project, membership: Option<&Membership>) -> Option<Role> {
    if project.is_owned_by(user_id) {
        return Some(Role::Owner);
    }

    membership
        .filter(|m| m.project_id == project.id && m.user_id == user_id)
        .map(|m| Role::from(m.role))
}

/// Loads the membership row of `user_id` and resolves their role
///
/// # Errors
///
/// Returns a store error if the membership lookup fails.
pub async fn resolve_role(
    tx: &mut dyn StoreTx,
    user_id: Uuid,
    project: &Project,
) -> StoreResult<Option<Role>> {
    if project.is_owned_by(user_id) {
        return Ok(Some(Role::Owner));
    }

    let membership = tx.find_membership(project.id, user_id).await?;
    Ok(resolve(user_id, project, membership.as_ref()))
}

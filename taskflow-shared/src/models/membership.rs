//! Project membership model
//!
//! Memberships join users to projects with a role. The pair
//! `(project_id, user_id)` is unique.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE membership_role AS ENUM ('admin', 'member', 'viewer');
//!
//! CREATE TABLE project_members (
//!     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     role membership_role NOT NULL DEFAULT 'member',
//!     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     PRIMARY KEY (project_id, user_id)
//! );
//! ```
//!
//! # Roles
//!
//! A stored membership carries a [`MembershipRole`]. The role a user actually
//! acts with inside a project is the [`Role`] computed by
//! [`crate::auth::resolver::resolve`], which adds `Owner` on top:
//!
//! - **owner**: the project's owner, regardless of their membership row
//! - **admin**: manage members, labels and every task
//! - **member**: create and work on tasks, self-assign
//! - **viewer**: read and comment only

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role stored on a membership row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    /// Manage users, labels and all tasks
    Admin,

    /// Create and work on tasks
    Member,

    /// Read-only access (plus comments)
    Viewer,
}

impl MembershipRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Admin => "admin",
            MembershipRole::Member => "member",
            MembershipRole::Viewer => "viewer",
        }
    }
}

impl Default for MembershipRole {
    fn default() -> Self {
        MembershipRole::Member
    }
}

/// Effective role of a user inside one project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Project owner, supersedes any membership row
    Owner,

    /// Admin membership
    Admin,

    /// Plain member
    Member,

    /// Read-only member
    Viewer,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Viewer => "viewer",
        }
    }

    /// Owner or admin
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    /// Can create and modify tasks
    pub fn can_contribute(&self) -> bool {
        !matches!(self, Role::Viewer)
    }

    /// Checks if this role has at least the permission level of `required`
    ///
    /// Hierarchy: Owner > Admin > Member > Viewer
    pub fn has_permission(&self, required: &Role) -> bool {
        self.permission_level() >= required.permission_level()
    }

    fn permission_level(&self) -> u8 {
        match self {
            Role::Owner => 4,
            Role::Admin => 3,
            Role::Member => 2,
            Role::Viewer => 1,
        }
    }
}

impl From<MembershipRole> for Role {
    fn from(role: MembershipRole) -> Self {
        match role {
            MembershipRole::Admin => Role::Admin,
            MembershipRole::Member => Role::Member,
            MembershipRole::Viewer => Role::Viewer,
        }
    }
}

/// Membership row joining a user to a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the project
    pub role: MembershipRole,

    /// When the user joined
    pub joined_at: DateTime<Utc>,
}

/// Input for creating a membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role to grant (defaults to Member)
    #[serde(default)]
    pub role: MembershipRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_role_as_str() {
        assert_eq!(MembershipRole::Admin.as_str(), "admin");
        assert_eq!(MembershipRole::Member.as_str(), "member");
        assert_eq!(MembershipRole::Viewer.as_str(), "viewer");
    }

    #[test]
    fn test_default_role_is_member() {
        assert_eq!(MembershipRole::default(), MembershipRole::Member);
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Owner.has_permission(&Role::Admin));
        assert!(Role::Admin.has_permission(&Role::Member));
        assert!(Role::Member.has_permission(&Role::Viewer));
        assert!(!Role::Viewer.has_permission(&Role::Member));
        assert!(!Role::Admin.has_permission(&Role::Owner));
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Owner.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Member.is_admin());
        assert!(!Role::Viewer.is_admin());

        assert!(Role::Owner.can_contribute());
        assert!(Role::Member.can_contribute());
        assert!(!Role::Viewer.can_contribute());
    }

    #[test]
    fn test_role_from_membership_role() {
        assert_eq!(Role::from(MembershipRole::Admin), Role::Admin);
        assert_eq!(Role::from(MembershipRole::Member), Role::Member);
        assert_eq!(Role::from(MembershipRole::Viewer), Role::Viewer);
    }
}

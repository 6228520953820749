//! Project model
//!
//! A project is the tenant boundary of TaskFlow: it has exactly one owner,
//! a set of memberships, and contains tasks and labels.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE project_status AS ENUM ('active', 'archived', 'completed');
//!
//! CREATE TABLE projects (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(200) NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     status project_status NOT NULL DEFAULT 'active',
//!     color VARCHAR(7) NOT NULL DEFAULT '#6366f1',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! The owner is immutable after creation. An `admin` membership row for the
//! owner is written in the same transaction as the project itself (see
//! [`crate::services::projects::create_project`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default project color
pub const DEFAULT_PROJECT_COLOR: &str = "#6366f1";

/// Lifecycle status of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Work in progress
    Active,

    /// Hidden from day-to-day views
    Archived,

    /// Finished
    Completed,
}

impl ProjectStatus {
    /// Converts status to its wire/database name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Archived => "archived",
            ProjectStatus::Completed => "completed",
        }
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Active
    }
}

/// Project model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Project name
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Owning user, immutable
    pub owner_id: Uuid,

    /// Lifecycle status
    pub status: ProjectStatus,

    /// Hex color used by the board UI
    pub color: String,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Returns true if `user_id` owns this project
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    /// Project name
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Color, defaults to [`DEFAULT_PROJECT_COLOR`]
    #[serde(default)]
    pub color: Option<String>,
}

impl CreateProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            color: None,
        }
    }
}

/// Partial update of a project
///
/// `None` fields are left untouched. The owner cannot be changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    /// New name
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New status
    pub status: Option<ProjectStatus>,

    /// New color
    pub color: Option<String>,
}

impl UpdateProject {
    /// Applies the update to `project` and returns the names of the fields
    /// whose value actually changed
    pub fn apply_to(&self, project: &mut Project) -> Vec<&'static str> {
        let mut changes = Vec::new();

        if let Some(name) = &self.name {
            if *name != project.name {
                project.name = name.clone();
                changes.push("name");
            }
        }
        if let Some(description) = &self.description {
            if *description != project.description {
                project.description = description.clone();
                changes.push("description");
            }
        }
        if let Some(status) = self.status {
            if status != project.status {
                project.status = status;
                changes.push("status");
            }
        }
        if let Some(color) = &self.color {
            if *color != project.color {
                project.color = color.clone();
                changes.push("color");
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "Board".to_string(),
            description: String::new(),
            owner_id: Uuid::new_v4(),
            status: ProjectStatus::Active,
            color: DEFAULT_PROJECT_COLOR.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_project_status_as_str() {
        assert_eq!(ProjectStatus::Active.as_str(), "active");
        assert_eq!(ProjectStatus::Archived.as_str(), "archived");
        assert_eq!(ProjectStatus::Completed.as_str(), "completed");
        assert_eq!(ProjectStatus::default(), ProjectStatus::Active);
    }

    #[test]
    fn test_update_reports_only_changed_fields() {
        let mut project = sample();
        let update = UpdateProject {
            name: Some("Board".to_string()),
            status: Some(ProjectStatus::Archived),
            ..Default::default()
        };

        let changes = update.apply_to(&mut project);
        assert_eq!(changes, vec!["status"]);
        assert_eq!(project.status, ProjectStatus::Archived);
    }

    #[test]
    fn test_is_owned_by() {
        let project = sample();
        assert!(project.is_owned_by(project.owner_id));
        assert!(!project.is_owned_by(Uuid::new_v4()));
    }
}

//! Label model
//!
//! Labels belong to a project and are attached to that project's tasks
//! through the `task_labels` join table.
//!
//! ```sql
//! CREATE TABLE labels (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
//!     name VARCHAR(50) NOT NULL,
//!     color VARCHAR(7) NOT NULL DEFAULT '#6366f1',
//!     UNIQUE (project_id, name)
//! );
//!
//! CREATE TABLE task_labels (
//!     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
//!     label_id UUID NOT NULL REFERENCES labels(id) ON DELETE CASCADE,
//!     PRIMARY KEY (task_id, label_id)
//! );
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default label color
pub const DEFAULT_LABEL_COLOR: &str = "#6366f1";

/// A project-scoped label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Label {
    pub id: Uuid,
    pub project_id: Uuid,

    /// Unique within the project
    pub name: String,

    /// Hex color
    pub color: String,
}

/// Input for creating a label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLabel {
    pub name: String,

    #[serde(default)]
    pub color: Option<String>,
}

/// Partial update of a label
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLabel {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl UpdateLabel {
    /// Applies the update, returning true if anything changed
    pub fn apply_to(&self, label: &mut Label) -> bool {
        let mut changed = false;
        if let Some(name) = &self.name {
            if *name != label.name {
                label.name = name.clone();
                changed = true;
            }
        }
        if let Some(color) = &self.color {
            if *color != label.color {
                label.color = color.clone();
                changed = true;
            }
        }
        changed
    }
}

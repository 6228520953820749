//! Transactional persistence port
//!
//! Every request runs inside one [`StoreTx`] obtained from [`Store::begin`].
//! Services only talk to the store through this trait; they never build
//! queries themselves. A transaction that is dropped without
//! [`StoreTx::commit`] is rolled back, so an early `?` return or a client
//! disconnect leaves no partial writes behind.
//!
//! Two implementations ship with the crate:
//!
//! - [`postgres::PgStore`]: sqlx on PostgreSQL, used by the server
//! - [`memory::MemoryStore`]: in-process, used by tests
//!
//! # Board lock
//!
//! Operations that shift positions call [`StoreTx::lock_project`] first.
//! While one transaction holds the lock, every other transaction that wants
//! to move tasks in the same project waits, so shifts are never computed
//! against a stale column.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::activity::Activity;
use crate::models::comment::Comment;
use crate::models::label::Label;
use crate::models::membership::{Membership, MembershipRole};
use crate::models::project::Project;
use crate::models::task::{Task, TaskStatus};
use crate::models::user::User;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("conflict: {0}")]
    Conflict(String),

    /// Database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The transaction was already committed or rolled back
    #[error("transaction already closed")]
    TransactionClosed,
}

/// Entry point of a store: opens transactions
#[async_trait]
pub trait Store: Send + Sync {
    /// Begins a new transaction
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if no connection is available.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Checks that the backing store is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// A single open transaction
///
/// `find_*` methods return `Ok(None)` for missing rows. `update_*` and
/// `delete_*` methods return `Ok(false)` when no row matched.
#[async_trait]
pub trait StoreTx: Send {
    /// Commits every write made through this transaction
    async fn commit(&mut self) -> StoreResult<()>;

    /// Discards every write made through this transaction
    async fn rollback(&mut self) -> StoreResult<()>;

    // Users

    /// Inserts a user
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the email is taken.
    async fn insert_user(&mut self, user: &User) -> StoreResult<()>;

    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>>;

    /// Looks up a user by normalized email
    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>>;

    // Projects

    async fn insert_project(&mut self, project: &Project) -> StoreResult<()>;

    async fn find_project(&mut self, id: Uuid) -> StoreResult<Option<Project>>;

    /// Reads a project and takes its board lock until the transaction ends
    async fn lock_project(&mut self, id: Uuid) -> StoreResult<Option<Project>>;

    /// Writes name, description, status, color and updated_at
    async fn update_project(&mut self, project: &Project) -> StoreResult<bool>;

    /// Deletes a project with its memberships, tasks, labels and activity
    async fn delete_project(&mut self, id: Uuid) -> StoreResult<bool>;

    /// Projects owned by or shared with `user_id`, newest first
    async fn list_projects_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Project>>;

    // Memberships

    /// Inserts a membership
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the user is already a member.
    async fn insert_membership(&mut self, membership: &Membership) -> StoreResult<()>;

    async fn find_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Membership>>;

    /// Memberships of a project, oldest first
    async fn list_memberships(&mut self, project_id: Uuid) -> StoreResult<Vec<Membership>>;

    async fn update_membership_role(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> StoreResult<bool>;

    async fn delete_membership(&mut self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    // Tasks

    async fn insert_task(&mut self, task: &Task) -> StoreResult<()>;

    async fn find_task(&mut self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Reads a task and locks its row until the transaction ends
    async fn find_task_for_update(&mut self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Writes title, description, priority, due date and `updated_at`
    ///
    /// Status, position and assignee are left alone. Returns the stored row,
    /// which carries the current board placement even if `task` was read
    /// before a concurrent move committed.
    async fn update_task_fields(&mut self, task: &Task) -> StoreResult<Option<Task>>;

    /// Sets or clears the assignee; returns the stored row
    async fn set_task_assignee(
        &mut self,
        id: Uuid,
        assignee_id: Option<Uuid>,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<Task>>;

    /// Writes a task's column and slot. Only the position engine calls this,
    /// under the project's board lock.
    async fn place_task(
        &mut self,
        id: Uuid,
        status: TaskStatus,
        position: i32,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Deletes a task with its comments and label links; activity rows keep
    /// existing with a null task
    async fn delete_task(&mut self, id: Uuid) -> StoreResult<bool>;

    /// Tasks of a project ordered by position, then newest first
    async fn list_tasks(&mut self, project_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Number of tasks in one column
    async fn count_column(&mut self, project_id: Uuid, status: TaskStatus) -> StoreResult<i64>;

    /// Tasks of one column ordered by position
    async fn list_column(&mut self, project_id: Uuid, status: TaskStatus)
        -> StoreResult<Vec<Task>>;

    /// Adds `delta` to the position of every task in the column whose
    /// position lies in `from..=to` (`to = None` means unbounded), skipping
    /// `exclude`. Returns the number of shifted rows.
    async fn shift_positions(
        &mut self,
        project_id: Uuid,
        status: TaskStatus,
        from: i32,
        to: Option<i32>,
        delta: i32,
        exclude: Option<Uuid>,
    ) -> StoreResult<u64>;

    // Comments

    async fn insert_comment(&mut self, comment: &Comment) -> StoreResult<()>;

    async fn find_comment(&mut self, id: Uuid) -> StoreResult<Option<Comment>>;

    /// Comments of a task, oldest first
    async fn list_comments(&mut self, task_id: Uuid) -> StoreResult<Vec<Comment>>;

    /// Writes content and updated_at
    async fn update_comment(&mut self, comment: &Comment) -> StoreResult<bool>;

    async fn delete_comment(&mut self, id: Uuid) -> StoreResult<bool>;

    // Labels

    /// Inserts a label
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the name is taken in the project.
    async fn insert_label(&mut self, label: &Label) -> StoreResult<()>;

    async fn find_label(&mut self, id: Uuid) -> StoreResult<Option<Label>>;

    /// Labels of a project ordered by name
    async fn list_labels(&mut self, project_id: Uuid) -> StoreResult<Vec<Label>>;

    /// Writes name and color
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the new name is taken.
    async fn update_label(&mut self, label: &Label) -> StoreResult<bool>;

    async fn delete_label(&mut self, id: Uuid) -> StoreResult<bool>;

    /// Links a label to a task, returning false if it was already linked
    async fn attach_label(&mut self, task_id: Uuid, label_id: Uuid) -> StoreResult<bool>;

    /// Unlinks a label from a task, returning false if it was not linked
    async fn detach_label(&mut self, task_id: Uuid, label_id: Uuid) -> StoreResult<bool>;

    /// Labels attached to a task ordered by name
    async fn labels_for_task(&mut self, task_id: Uuid) -> StoreResult<Vec<Label>>;

    // Activity

    /// Appends an activity row and returns its stored `created_at`
    async fn insert_activity(&mut self, activity: &Activity) -> StoreResult<DateTime<Utc>>;

    /// Newest `limit` activities of a project, newest first
    async fn list_activities(&mut self, project_id: Uuid, limit: i64)
        -> StoreResult<Vec<Activity>>;
}

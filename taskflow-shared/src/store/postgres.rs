//! PostgreSQL store
//!
//! Each [`PgTx`] wraps one sqlx transaction. Position uniqueness per column is
//! enforced by the deferred `tasks_column_position_key` constraint, so a
//! column may hold duplicates between statements but never at commit.
//!
//! # Example
//!
//! ```no_run
//! use taskflow_shared::db::pool::{create_pool, DatabaseConfig};
//! use taskflow_shared::store::postgres::PgStore;
//! use taskflow_shared::store::Store;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//! let store = PgStore::new(pool);
//!
//! let mut tx = store.begin().await?;
//! // ... reads and writes ...
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool};
use sqlx::{Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, StoreTx};
use crate::db::pool::health_check;
use crate::models::activity::Activity;
use crate::models::comment::Comment;
use crate::models::label::Label;
use crate::models::membership::{Membership, MembershipRole};
use crate::models::project::Project;
use crate::models::task::{Task, TaskStatus};
use crate::models::user::User;

const USER_COLUMNS: &str = "id, email, display_name, created_at";
const PROJECT_COLUMNS: &str =
    "id, name, description, owner_id, status, color, created_at, updated_at";
const MEMBERSHIP_COLUMNS: &str = "project_id, user_id, role, joined_at";
const TASK_COLUMNS: &str = "id, project_id, title, description, created_by, assignee_id, \
     status, priority, due_date, position, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, task_id, user_id, content, created_at, updated_at";
const LABEL_COLUMNS: &str = "id, project_id, name, color";
const ACTIVITY_COLUMNS: &str =
    "id, user_id, project_id, task_id, kind, description, details, created_at";

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx: Some(tx) }))
    }

    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }
}

/// Open PostgreSQL transaction
///
/// Dropping it without commit rolls back (sqlx issues the ROLLBACK when the
/// connection returns to the pool).
pub struct PgTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
    fn conn(&mut self) -> StoreResult<&mut PgConnection> {
        self.tx.as_deref_mut().ok_or(StoreError::TransactionClosed)
    }
}

/// Maps a unique violation to [`StoreError::Conflict`]
fn conflict_or(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(what.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(&mut self) -> StoreResult<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        // deferred constraints fire here
        tx.commit()
            .await
            .map_err(|e| conflict_or(e, "duplicate task position in column"))
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        sqlx::query("INSERT INTO users (id, email, display_name, created_at) VALUES ($1, $2, $3, $4)")
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(user.created_at)
            .execute(self.conn()?)
            .await
            .map_err(|e| conflict_or(e, "email already registered"))?;
        Ok(())
    }

    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(user)
    }

    async fn insert_project(&mut self, project: &Project) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, owner_id, status, color, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.owner_id)
        .bind(project.status)
        .bind(&project.color)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn find_project(&mut self, id: Uuid) -> StoreResult<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(project)
    }

    async fn lock_project(&mut self, id: Uuid) -> StoreResult<Option<Project>> {
        debug!(project_id = %id, "Taking board lock");
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 FOR NO KEY UPDATE");
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(project)
    }

    async fn update_project(&mut self, project: &Project) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET name = $2, description = $3, status = $4, color = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status)
        .bind(&project.color)
        .bind(project.updated_at)
        .execute(self.conn()?)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_project(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_projects_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        let sql = format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE owner_id = $1
               OR id IN (SELECT project_id FROM project_members WHERE user_id = $1)
            ORDER BY created_at DESC
            "#
        );
        let projects = sqlx::query_as::<_, Project>(&sql)
            .bind(user_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(projects)
    }

    async fn insert_membership(&mut self, membership: &Membership) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO project_members (project_id, user_id, role, joined_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(membership.project_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(membership.joined_at)
        .execute(self.conn()?)
        .await
        .map_err(|e| conflict_or(e, "user is already a member"))?;
        Ok(())
    }

    async fn find_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM project_members WHERE project_id = $1 AND user_id = $2"
        );
        let membership = sqlx::query_as::<_, Membership>(&sql)
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(membership)
    }

    async fn list_memberships(&mut self, project_id: Uuid) -> StoreResult<Vec<Membership>> {
        let sql = format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM project_members WHERE project_id = $1 ORDER BY joined_at ASC"
        );
        let memberships = sqlx::query_as::<_, Membership>(&sql)
            .bind(project_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(memberships)
    }

    async fn update_membership_role(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE project_members SET role = $3 WHERE project_id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .bind(role)
                .execute(self.conn()?)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_membership(&mut self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_task(&mut self, task: &Task) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, project_id, title, description, created_by, assignee_id,
                status, priority, due_date, position, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(task.id)
        .bind(task.project_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.created_by)
        .bind(task.assignee_id)
        .bind(task.status)
        .bind(task.priority)
        .bind(task.due_date)
        .bind(task.position)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn find_task(&mut self, id: Uuid) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(task)
    }

    async fn find_task_for_update(&mut self, id: Uuid) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE");
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(task)
    }

    async fn update_task_fields(&mut self, task: &Task) -> StoreResult<Option<Task>> {
        let sql = format!(
            r#"
            UPDATE tasks
            SET title = $2,
                description = $3,
                priority = $4,
                due_date = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        );
        let stored = sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.priority)
            .bind(task.due_date)
            .bind(task.updated_at)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(stored)
    }

    async fn set_task_assignee(
        &mut self,
        id: Uuid,
        assignee_id: Option<Uuid>,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let sql = format!(
            "UPDATE tasks SET assignee_id = $2, updated_at = $3 WHERE id = $1 RETURNING {TASK_COLUMNS}"
        );
        let stored = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(assignee_id)
            .bind(updated_at)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(stored)
    }

    async fn place_task(
        &mut self,
        id: Uuid,
        status: TaskStatus,
        position: i32,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks SET status = $2, position = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(position)
        .bind(updated_at)
        .execute(self.conn()?)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_task(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tasks(&mut self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY position ASC, created_at DESC"
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(project_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(tasks)
    }

    async fn count_column(&mut self, project_id: Uuid, status: TaskStatus) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE project_id = $1 AND status = $2")
                .bind(project_id)
                .bind(status)
                .fetch_one(self.conn()?)
                .await?;
        Ok(count)
    }

    async fn list_column(
        &mut self,
        project_id: Uuid,
        status: TaskStatus,
    ) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 AND status = $2 ORDER BY position ASC, created_at DESC"
        );
        let tasks = sqlx::query_as::<_, Task>(&sql)
            .bind(project_id)
            .bind(status)
            .fetch_all(self.conn()?)
            .await?;
        Ok(tasks)
    }

    async fn shift_positions(
        &mut self,
        project_id: Uuid,
        status: TaskStatus,
        from: i32,
        to: Option<i32>,
        delta: i32,
        exclude: Option<Uuid>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET position = position + $5
            WHERE project_id = $1
              AND status = $2
              AND position >= $3
              AND ($4::INTEGER IS NULL OR position <= $4)
              AND ($6::UUID IS NULL OR id <> $6)
            "#,
        )
        .bind(project_id)
        .bind(status)
        .bind(from)
        .bind(to)
        .bind(delta)
        .bind(exclude)
        .execute(self.conn()?)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_comment(&mut self, comment: &Comment) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, task_id, user_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(comment.id)
        .bind(comment.task_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(self.conn()?)
        .await?;
        Ok(())
    }

    async fn find_comment(&mut self, id: Uuid) -> StoreResult<Option<Comment>> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(comment)
    }

    async fn list_comments(&mut self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE task_id = $1 ORDER BY created_at ASC"
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(task_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(comments)
    }

    async fn update_comment(&mut self, comment: &Comment) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE comments SET content = $2, updated_at = $3 WHERE id = $1")
            .bind(comment.id)
            .bind(&comment.content)
            .bind(comment.updated_at)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comment(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_label(&mut self, label: &Label) -> StoreResult<()> {
        sqlx::query("INSERT INTO labels (id, project_id, name, color) VALUES ($1, $2, $3, $4)")
            .bind(label.id)
            .bind(label.project_id)
            .bind(&label.name)
            .bind(&label.color)
            .execute(self.conn()?)
            .await
            .map_err(|e| conflict_or(e, "label name already exists in project"))?;
        Ok(())
    }

    async fn find_label(&mut self, id: Uuid) -> StoreResult<Option<Label>> {
        let sql = format!("SELECT {LABEL_COLUMNS} FROM labels WHERE id = $1");
        let label = sqlx::query_as::<_, Label>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(label)
    }

    async fn list_labels(&mut self, project_id: Uuid) -> StoreResult<Vec<Label>> {
        let sql = format!("SELECT {LABEL_COLUMNS} FROM labels WHERE project_id = $1 ORDER BY name ASC");
        let labels = sqlx::query_as::<_, Label>(&sql)
            .bind(project_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(labels)
    }

    async fn update_label(&mut self, label: &Label) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE labels SET name = $2, color = $3 WHERE id = $1")
            .bind(label.id)
            .bind(&label.name)
            .bind(&label.color)
            .execute(self.conn()?)
            .await
            .map_err(|e| conflict_or(e, "label name already exists in project"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_label(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM labels WHERE id = $1")
            .bind(id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn attach_label(&mut self, task_id: Uuid, label_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO task_labels (task_id, label_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(task_id)
        .bind(label_id)
        .execute(self.conn()?)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn detach_label(&mut self, task_id: Uuid, label_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM task_labels WHERE task_id = $1 AND label_id = $2")
            .bind(task_id)
            .bind(label_id)
            .execute(self.conn()?)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn labels_for_task(&mut self, task_id: Uuid) -> StoreResult<Vec<Label>> {
        let labels = sqlx::query_as::<_, Label>(
            r#"
            SELECT l.id, l.project_id, l.name, l.color
            FROM labels l
            JOIN task_labels tl ON tl.label_id = l.id
            WHERE tl.task_id = $1
            ORDER BY l.name ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(self.conn()?)
        .await?;
        Ok(labels)
    }

    async fn insert_activity(&mut self, activity: &Activity) -> StoreResult<DateTime<Utc>> {
        // created_at comes from clock_timestamp() so rows of one transaction
        // keep their write order
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO activities (id, user_id, project_id, task_id, kind, description, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING created_at
            "#,
        )
        .bind(activity.id)
        .bind(activity.user_id)
        .bind(activity.project_id)
        .bind(activity.task_id)
        .bind(activity.kind)
        .bind(&activity.description)
        .bind(&activity.details)
        .fetch_one(self.conn()?)
        .await?;
        Ok(created_at)
    }

    async fn list_activities(
        &mut self,
        project_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<Activity>> {
        let sql = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE project_id = $1 ORDER BY created_at DESC LIMIT $2"
        );
        let activities = sqlx::query_as::<_, Activity>(&sql)
            .bind(project_id)
            .bind(limit)
            .fetch_all(self.conn()?)
            .await?;
        Ok(activities)
    }
}

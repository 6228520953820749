/// Task board endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects/:id/tasks` - List tasks (filters below)
/// - `POST /v1/projects/:id/tasks` - Create task at the end of its column
/// - `GET /v1/projects/:id/summary` - Counts by priority and status, overdue count
/// - `GET|PATCH|DELETE /v1/tasks/:id` - Detail, update fields, delete
/// - `POST /v1/tasks/:id/reorder` - Move to `{status, position}`
/// - `POST /v1/tasks/:id/status` - Move to the end of another column
/// - `POST /v1/tasks/:id/assign` - Set or clear the assignee
///
/// # List filters
///
/// `status`, `priority` (comma-separated), `assignee` (`me` or a user id),
/// `unassigned`, `search`, `due_before`, `due_after`, `overdue`,
/// `due_this_week`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use taskflow_shared::{
    auth::middleware::AuthContext,
    models::task::{
        double_option, AssigneeFilter, CreateTask, Task, TaskFilter, TaskPriority, TaskStatus,
        UpdateTask,
    },
    services::tasks::{self, ProjectSummary, TaskDetail},
};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    pub due_date: Option<NaiveDate>,

    pub assignee_id: Option<Uuid>,
}

/// Update task request
///
/// `due_date: null` clears the due date; an absent field is left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,

    #[serde(default, with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

/// Reorder request
#[derive(Debug, Deserialize, Validate)]
pub struct ReorderRequest {
    pub status: TaskStatus,

    /// Zero-based slot; values past the end of the column land at the end
    #[validate(range(min = 0, message = "Position must be non-negative"))]
    pub position: i32,
}

/// Status change request
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
}

/// Assign request; `null` clears the assignee
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub assignee: Option<Uuid>,
}

/// Raw task list query string
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    #[serde(default)]
    pub unassigned: bool,
    pub search: Option<String>,
    pub due_before: Option<NaiveDate>,
    pub due_after: Option<NaiveDate>,
    #[serde(default)]
    pub overdue: bool,
    #[serde(default)]
    pub due_this_week: bool,
}

fn invalid(field: &str, message: String) -> ApiError {
    ApiError::ValidationError(vec![ValidationErrorDetail {
        field: field.to_string(),
        message,
    }])
}

impl TaskListQuery {
    /// Parses the query into a [`TaskFilter`]
    ///
    /// # Errors
    ///
    /// Returns a 422 naming the first unknown status, priority or assignee.
    pub fn into_filter(self) -> ApiResult<TaskFilter> {
        let status = match self.status.as_deref() {
            Some(value) => Some(
                TaskStatus::parse(value)
                    .ok_or_else(|| invalid("status", format!("Unknown status: {}", value)))?,
            ),
            None => None,
        };

        let mut priorities = Vec::new();
        for value in self
            .priority
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            priorities.push(
                TaskPriority::parse(value)
                    .ok_or_else(|| invalid("priority", format!("Unknown priority: {}", value)))?,
            );
        }

        let assignee = match self.assignee.as_deref() {
            Some(value) => Some(AssigneeFilter::parse(value).ok_or_else(|| {
                invalid("assignee", "Assignee must be 'me' or a user id".to_string())
            })?),
            None => None,
        };

        Ok(TaskFilter {
            status,
            priorities,
            assignee,
            unassigned: self.unassigned,
            search: self
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            due_before: self.due_before,
            due_after: self.due_after,
            overdue: self.overdue,
            due_this_week: self.due_this_week,
        })
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let filter = query.into_filter()?;

    let mut tx = state.store.begin().await?;
    let tasks = tasks::list_tasks(tx.as_mut(), auth.user_id, project_id, &filter, today()).await?;
    Ok(Json(tasks))
}

/// Create task
///
/// ```text
/// POST /v1/projects/:id/tasks
/// {"title": "Write release notes", "priority": "high", "assignee_id": "..."}
/// ```
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let mut tx = state.store.begin().await?;
    let task = tasks::create_task(
        tx.as_mut(),
        auth.user_id,
        project_id,
        CreateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
            assignee_id: req.assignee_id,
        },
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskDetail>> {
    let mut tx = state.store.begin().await?;
    let detail = tasks::get_task(tx.as_mut(), auth.user_id, id).await?;
    Ok(Json(detail))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let mut tx = state.store.begin().await?;
    let task = tasks::update_task(
        tx.as_mut(),
        auth.user_id,
        id,
        UpdateTask {
            title: req.title,
            description: req.description,
            priority: req.priority,
            due_date: req.due_date,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut tx = state.store.begin().await?;
    tasks::delete_task(tx.as_mut(), auth.user_id, id).await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Move a task on the board
///
/// Resubmitting the task's current slot is a no-op and returns it
/// unchanged.
pub async fn reorder_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let mut tx = state.store.begin().await?;
    let task = tasks::reorder_task(tx.as_mut(), auth.user_id, id, req.status, req.position).await?;
    tx.commit().await?;

    Ok(Json(task))
}

pub async fn change_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<Task>> {
    let mut tx = state.store.begin().await?;
    let task = tasks::change_status(tx.as_mut(), auth.user_id, id, req.status).await?;
    tx.commit().await?;

    Ok(Json(task))
}

/// Assign or unassign a task
///
/// # Errors
///
/// - `400 Bad Request`: Assignee is not part of the project
/// - `403 Forbidden`: A member assigning someone other than themselves
/// - `404 Not Found`: Unknown assignee
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<Json<Task>> {
    let mut tx = state.store.begin().await?;
    let task = tasks::assign_task(tx.as_mut(), auth.user_id, id, req.assignee).await?;
    tx.commit().await?;

    Ok(Json(task))
}

pub async fn project_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectSummary>> {
    let mut tx = state.store.begin().await?;
    let summary = tasks::project_summary(tx.as_mut(), auth.user_id, project_id, today()).await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_matches_everything() {
        assert_eq!(TaskListQuery::default().into_filter().unwrap(), TaskFilter::default());
    }

    #[test]
    fn test_query_parses_lists_and_assignee() {
        let filter = TaskListQuery {
            status: Some("in_progress".to_string()),
            priority: Some("high, urgent".to_string()),
            assignee: Some("me".to_string()),
            search: Some("  ".to_string()),
            ..Default::default()
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.status, Some(TaskStatus::InProgress));
        assert_eq!(filter.priorities, vec![TaskPriority::High, TaskPriority::Urgent]);
        assert_eq!(filter.assignee, Some(AssigneeFilter::Me));
        assert_eq!(filter.search, None);
    }

    #[test]
    fn test_query_rejects_unknown_values() {
        let bad_status = TaskListQuery {
            status: Some("blocked".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_status.into_filter(), Err(ApiError::ValidationError(_))));

        let bad_assignee = TaskListQuery {
            assignee: Some("someone".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_assignee.into_filter(), Err(ApiError::ValidationError(_))));
    }
}

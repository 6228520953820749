//! In-memory store
//!
//! Holds all state behind one async mutex. A transaction takes the mutex for
//! its whole lifetime and works on a private copy of the state; commit swaps
//! the copy in, drop discards it. Transactions are therefore fully
//! serialized, which also makes [`StoreTx::lock_project`] a plain read.
//!
//! Do not begin a second transaction on the same task while one is open:
//! the second `begin` waits for the first to finish.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult, StoreTx};
use crate::models::activity::Activity;
use crate::models::comment::Comment;
use crate::models::label::Label;
use crate::models::membership::{Membership, MembershipRole};
use crate::models::project::Project;
use crate::models::task::{Task, TaskStatus};
use crate::models::user::User;

/// Thread-safe in-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    memberships: Vec<Membership>,
    tasks: HashMap<Uuid, Task>,
    comments: Vec<Comment>,
    labels: HashMap<Uuid, Label>,
    task_labels: BTreeSet<(Uuid, Uuid)>,
    activities: Vec<Activity>,
}

impl MemoryState {
    /// Mirrors the deferred `(project_id, status, position)` constraint
    fn check_positions(&self) -> StoreResult<()> {
        let mut seen = BTreeSet::new();
        for task in self.tasks.values() {
            if !seen.insert((task.project_id, task.status, task.position)) {
                return Err(StoreError::Conflict(format!(
                    "duplicate position {} in column {}",
                    task.position, task.status
                )));
            }
        }
        Ok(())
    }

    fn remove_task(&mut self, id: Uuid) -> bool {
        if self.tasks.remove(&id).is_none() {
            return false;
        }
        self.comments.retain(|c| c.task_id != id);
        self.task_labels.retain(|(task_id, _)| *task_id != id);
        for activity in self.activities.iter_mut() {
            if activity.task_id == Some(id) {
                activity.task_id = None;
            }
        }
        true
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            inner: Some((guard, working)),
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Open in-memory transaction
pub struct MemoryTx {
    inner: Option<(OwnedMutexGuard<MemoryState>, MemoryState)>,
}

impl MemoryTx {
    fn state(&mut self) -> StoreResult<&mut MemoryState> {
        self.inner
            .as_mut()
            .map(|(_, working)| working)
            .ok_or(StoreError::TransactionClosed)
    }
}

fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(&mut self) -> StoreResult<()> {
        let (mut guard, working) = self.inner.take().ok_or(StoreError::TransactionClosed)?;
        working.check_positions()?;
        *guard = working;
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.inner.take().ok_or(StoreError::TransactionClosed)?;
        Ok(())
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        let state = self.state()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .state()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_project(&mut self, project: &Project) -> StoreResult<()> {
        self.state()?.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn find_project(&mut self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.state()?.projects.get(&id).cloned())
    }

    async fn lock_project(&mut self, id: Uuid) -> StoreResult<Option<Project>> {
        self.find_project(id).await
    }

    async fn update_project(&mut self, project: &Project) -> StoreResult<bool> {
        let state = self.state()?;
        match state.projects.get_mut(&project.id) {
            Some(existing) => {
                existing.name = project.name.clone();
                existing.description = project.description.clone();
                existing.status = project.status;
                existing.color = project.color.clone();
                existing.updated_at = project.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_project(&mut self, id: Uuid) -> StoreResult<bool> {
        let state = self.state()?;
        if state.projects.remove(&id).is_none() {
            return Ok(false);
        }

        let task_ids: Vec<Uuid> = state
            .tasks
            .values()
            .filter(|t| t.project_id == id)
            .map(|t| t.id)
            .collect();
        for task_id in task_ids {
            state.remove_task(task_id);
        }

        let label_ids: BTreeSet<Uuid> = state
            .labels
            .values()
            .filter(|l| l.project_id == id)
            .map(|l| l.id)
            .collect();
        state.labels.retain(|_, l| l.project_id != id);
        state
            .task_labels
            .retain(|(_, label_id)| !label_ids.contains(label_id));

        state.memberships.retain(|m| m.project_id != id);
        state.activities.retain(|a| a.project_id != id);
        Ok(true)
    }

    async fn list_projects_for_user(&mut self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        let state = self.state()?;
        let mut projects: Vec<Project> = state
            .projects
            .values()
            .filter(|p| {
                p.owner_id == user_id
                    || state
                        .memberships
                        .iter()
                        .any(|m| m.project_id == p.id && m.user_id == user_id)
            })
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn insert_membership(&mut self, membership: &Membership) -> StoreResult<()> {
        let state = self.state()?;
        if state
            .memberships
            .iter()
            .any(|m| m.project_id == membership.project_id && m.user_id == membership.user_id)
        {
            return Err(StoreError::Conflict("user is already a member".to_string()));
        }
        state.memberships.push(membership.clone());
        Ok(())
    }

    async fn find_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        Ok(self
            .state()?
            .memberships
            .iter()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_memberships(&mut self, project_id: Uuid) -> StoreResult<Vec<Membership>> {
        Ok(self
            .state()?
            .memberships
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn update_membership_role(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> StoreResult<bool> {
        let state = self.state()?;
        match state
            .memberships
            .iter_mut()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
        {
            Some(membership) => {
                membership.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_membership(&mut self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let state = self.state()?;
        let before = state.memberships.len();
        state
            .memberships
            .retain(|m| !(m.project_id == project_id && m.user_id == user_id));
        Ok(state.memberships.len() != before)
    }

    async fn insert_task(&mut self, task: &Task) -> StoreResult<()> {
        self.state()?.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn find_task(&mut self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.state()?.tasks.get(&id).cloned())
    }

    async fn find_task_for_update(&mut self, id: Uuid) -> StoreResult<Option<Task>> {
        self.find_task(id).await
    }

    async fn update_task_fields(&mut self, task: &Task) -> StoreResult<Option<Task>> {
        let state = self.state()?;
        Ok(state.tasks.get_mut(&task.id).map(|existing| {
            existing.title = task.title.clone();
            existing.description = task.description.clone();
            existing.priority = task.priority;
            existing.due_date = task.due_date;
            existing.updated_at = task.updated_at;
            existing.clone()
        }))
    }

    async fn set_task_assignee(
        &mut self,
        id: Uuid,
        assignee_id: Option<Uuid>,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let state = self.state()?;
        Ok(state.tasks.get_mut(&id).map(|existing| {
            existing.assignee_id = assignee_id;
            existing.updated_at = updated_at;
            existing.clone()
        }))
    }

    async fn place_task(
        &mut self,
        id: Uuid,
        status: TaskStatus,
        position: i32,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let state = self.state()?;
        match state.tasks.get_mut(&id) {
            Some(existing) => {
                existing.status = status;
                existing.position = position;
                existing.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state()?.remove_task(id))
    }

    async fn list_tasks(&mut self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .state()?
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    async fn count_column(&mut self, project_id: Uuid, status: TaskStatus) -> StoreResult<i64> {
        let count = self
            .state()?
            .tasks
            .values()
            .filter(|t| t.project_id == project_id && t.status == status)
            .count();
        Ok(count as i64)
    }

    async fn list_column(
        &mut self,
        project_id: Uuid,
        status: TaskStatus,
    ) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .state()?
            .tasks
            .values()
            .filter(|t| t.project_id == project_id && t.status == status)
            .cloned()
            .collect();
        sort_tasks(&mut tasks);
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
        let mut shifted = 0;
        for task in self.state()?.tasks.values_mut() {
            if task.project_id != project_id || task.status != status {
                continue;
            }
            if Some(task.id) == exclude {
                continue;
            }
            if task.position < from || to.map_or(false, |to| task.position > to) {
                continue;
            }
            task.position += delta;
            shifted += 1;
        }
        Ok(shifted)
    }

    async fn insert_comment(&mut self, comment: &Comment) -> StoreResult<()> {
        self.state()?.comments.push(comment.clone());
        Ok(())
    }

    async fn find_comment(&mut self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self.state()?.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(&mut self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        Ok(self
            .state()?
            .comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn update_comment(&mut self, comment: &Comment) -> StoreResult<bool> {
        let state = self.state()?;
        match state.comments.iter_mut().find(|c| c.id == comment.id) {
            Some(existing) => {
                existing.content = comment.content.clone();
                existing.updated_at = comment.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_comment(&mut self, id: Uuid) -> StoreResult<bool> {
        let state = self.state()?;
        let before = state.comments.len();
        state.comments.retain(|c| c.id != id);
        Ok(state.comments.len() != before)
    }

    async fn insert_label(&mut self, label: &Label) -> StoreResult<()> {
        let state = self.state()?;
        if state
            .labels
            .values()
            .any(|l| l.project_id == label.project_id && l.name == label.name)
        {
            return Err(StoreError::Conflict(format!("label {} already exists", label.name)));
        }
        state.labels.insert(label.id, label.clone());
        Ok(())
    }

    async fn find_label(&mut self, id: Uuid) -> StoreResult<Option<Label>> {
        Ok(self.state()?.labels.get(&id).cloned())
    }

    async fn list_labels(&mut self, project_id: Uuid) -> StoreResult<Vec<Label>> {
        let mut labels: Vec<Label> = self
            .state()?
            .labels
            .values()
            .filter(|l| l.project_id == project_id)
            .cloned()
            .collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(labels)
    }

    async fn update_label(&mut self, label: &Label) -> StoreResult<bool> {
        let state = self.state()?;
        if state
            .labels
            .values()
            .any(|l| l.id != label.id && l.project_id == label.project_id && l.name == label.name)
        {
            return Err(StoreError::Conflict(format!("label {} already exists", label.name)));
        }
        match state.labels.get_mut(&label.id) {
            Some(existing) => {
                existing.name = label.name.clone();
                existing.color = label.color.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_label(&mut self, id: Uuid) -> StoreResult<bool> {
        let state = self.state()?;
        if state.labels.remove(&id).is_none() {
            return Ok(false);
        }
        state.task_labels.retain(|(_, label_id)| *label_id != id);
        Ok(true)
    }

    async fn attach_label(&mut self, task_id: Uuid, label_id: Uuid) -> StoreResult<bool> {
        Ok(self.state()?.task_labels.insert((task_id, label_id)))
    }

    async fn detach_label(&mut self, task_id: Uuid, label_id: Uuid) -> StoreResult<bool> {
        Ok(self.state()?.task_labels.remove(&(task_id, label_id)))
    }

    async fn labels_for_task(&mut self, task_id: Uuid) -> StoreResult<Vec<Label>> {
        let state = self.state()?;
        let mut labels: Vec<Label> = state
            .task_labels
            .iter()
            .filter(|(t, _)| *t == task_id)
            .filter_map(|(_, label_id)| state.labels.get(label_id).cloned())
            .collect();
        labels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(labels)
    }

    async fn insert_activity(&mut self, activity: &Activity) -> StoreResult<DateTime<Utc>> {
        self.state()?.activities.push(activity.clone());
        Ok(activity.created_at)
    }

    async fn list_activities(
        &mut self,
        project_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<Activity>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .state()?
            .activities
            .iter()
            .rev()
            .filter(|a| a.project_id == project_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::{ProjectStatus, DEFAULT_PROJECT_COLOR};
    use crate::models::task::TaskPriority;
    use chrono::Utc;

    fn project() -> Project {
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

    fn task(project_id: Uuid, position: i32) -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id,
            title: format!("task {}", position),
            description: String::new(),
            created_by: None,
            assignee_id: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            position,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryStore::new();
        let p = project();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_project(&p).await.unwrap();
            // dropped without commit
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_project(p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_persists_and_closes() {
        let store = MemoryStore::new();
        let p = project();

        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&p).await.unwrap();
        tx.commit().await.unwrap();
        assert!(matches!(
            tx.find_project(p.id).await,
            Err(StoreError::TransactionClosed)
        ));
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.find_project(p.id).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn test_field_update_keeps_board_placement() {
        let store = MemoryStore::new();
        let p = project();
        let t = task(p.id, 0);

        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&p).await.unwrap();
        tx.insert_task(&t).await.unwrap();

        // copy read before the move lands
        let mut stale = t.clone();
        assert!(tx
            .place_task(t.id, TaskStatus::InProgress, 0, Utc::now())
            .await
            .unwrap());

        stale.title = "renamed".to_string();
        stale.priority = TaskPriority::Urgent;
        let stored = tx.update_task_fields(&stale).await.unwrap().unwrap();
        assert_eq!(stored.title, "renamed");
        assert_eq!(stored.priority, TaskPriority::Urgent);
        assert_eq!(stored.status, TaskStatus::InProgress);
        assert_eq!(stored.position, 0);

        let assignee = Uuid::new_v4();
        let stored = tx
            .set_task_assignee(t.id, Some(assignee), Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.assignee_id, Some(assignee));
        assert_eq!(stored.status, TaskStatus::InProgress);
        assert_eq!(stored.title, "renamed");

        assert!(tx
            .update_task_fields(&task(p.id, 5))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_commit_rejects_duplicate_positions() {
        let store = MemoryStore::new();
        let p = project();

        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&p).await.unwrap();
        tx.insert_task(&task(p.id, 0)).await.unwrap();
        tx.insert_task(&task(p.id, 0)).await.unwrap();
        assert!(matches!(tx.commit().await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_shift_positions_respects_range_and_exclude() {
        let store = MemoryStore::new();
        let p = project();
        let tasks: Vec<Task> = (0..4).map(|i| task(p.id, i)).collect();

        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&p).await.unwrap();
        for t in &tasks {
            tx.insert_task(t).await.unwrap();
        }

        let shifted = tx
            .shift_positions(p.id, TaskStatus::Todo, 1, Some(2), 10, Some(tasks[2].id))
            .await
            .unwrap();
        assert_eq!(shifted, 1);

        let positions: Vec<i32> = tx
            .list_column(p.id, TaskStatus::Todo)
            .await
            .unwrap()
            .iter()
            .map(|t| t.position)
            .collect();
        assert_eq!(positions, vec![0, 2, 3, 11]);
    }

    #[tokio::test]
    async fn test_duplicate_membership_conflicts() {
        let store = MemoryStore::new();
        let membership = Membership {
            project_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: MembershipRole::Member,
            joined_at: Utc::now(),
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_membership(&membership).await.unwrap();
        assert!(matches!(
            tx.insert_membership(&membership).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_task_keeps_activity_with_null_task() {
        let store = MemoryStore::new();
        let p = project();
        let t = task(p.id, 0);
        let activity = Activity {
            id: Uuid::new_v4(),
            user_id: None,
            project_id: p.id,
            task_id: Some(t.id),
            kind: crate::models::activity::ActivityKind::TaskCreated,
            description: "created".to_string(),
            details: serde_json::json!({}),
            created_at: Utc::now(),
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&p).await.unwrap();
        tx.insert_task(&t).await.unwrap();
        tx.insert_activity(&activity).await.unwrap();
        assert!(tx.delete_task(t.id).await.unwrap());

        let feed = tx.list_activities(p.id, 50).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].task_id, None);
    }
}

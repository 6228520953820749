//! Shared setup for taskflow-shared integration tests

use std::collections::BTreeMap;

use taskflow_shared::models::membership::MembershipRole;
use taskflow_shared::models::project::{CreateProject, Project};
use taskflow_shared::models::task::{CreateTask, Task, TaskStatus};
use taskflow_shared::models::user::{CreateUser, User};
use taskflow_shared::services::{projects, tasks, users};
use taskflow_shared::store::memory::MemoryStore;
use taskflow_shared::store::{Store, StoreTx};
use uuid::Uuid;

/// A committed project with its owner and extra members
pub struct Board {
    pub store: MemoryStore,
    pub owner: User,
    pub project: Project,
}

pub async fn user(tx: &mut dyn StoreTx, name: &str) -> User {
    users::register_user(tx, CreateUser::new(format!("{}@example.com", name), name))
        .await
        .unwrap()
}

impl Board {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let owner = user(tx.as_mut(), "owner").await;
        let project = projects::create_project(tx.as_mut(), owner.id, CreateProject::new("Board"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        Self {
            store,
            owner,
            project,
        }
    }

    /// Registers a user and adds them to the project with `role`
    pub async fn member(&self, name: &str, role: MembershipRole) -> User {
        let mut tx = self.store.begin().await.unwrap();
        let member = user(tx.as_mut(), name).await;
        projects::invite_member(tx.as_mut(), self.owner.id, self.project.id, &member.email, role)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        member
    }

    /// Creates tasks with the given titles in `status`, in order
    pub async fn tasks(&self, status: TaskStatus, titles: &[&str]) -> Vec<Task> {
        let mut tx = self.store.begin().await.unwrap();
        let mut created = Vec::new();
        for title in titles {
            let input = CreateTask {
                status,
                ..CreateTask::new(*title)
            };
            created.push(
                tasks::create_task(tx.as_mut(), self.owner.id, self.project.id, input)
                    .await
                    .unwrap(),
            );
        }
        tx.commit().await.unwrap();
        created
    }

    /// Task titles of one column in position order
    pub async fn column(&self, status: TaskStatus) -> Vec<String> {
        let mut tx = self.store.begin().await.unwrap();
        tx.list_column(self.project.id, status)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect()
    }

    /// Asserts that every column holds positions `0..len`
    pub async fn assert_dense(&self) {
        let mut tx = self.store.begin().await.unwrap();
        let all = tx.list_tasks(self.project.id).await.unwrap();

        let mut columns: BTreeMap<TaskStatus, Vec<i32>> = BTreeMap::new();
        for task in &all {
            columns.entry(task.status).or_default().push(task.position);
        }
        for (status, mut positions) in columns {
            positions.sort_unstable();
            let expected: Vec<i32> = (0..positions.len() as i32).collect();
            assert_eq!(positions, expected, "column {} is not dense", status);
        }
    }

    pub async fn find(&self, id: Uuid) -> Task {
        let mut tx = self.store.begin().await.unwrap();
        tx.find_task(id).await.unwrap().unwrap()
    }
}

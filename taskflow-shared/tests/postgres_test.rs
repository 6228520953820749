//! PostgreSQL store tests
//!
//! Need a database: `DATABASE_URL=postgresql://localhost/taskflow_test
//! cargo test -p taskflow-shared -- --ignored`

use std::collections::BTreeMap;
use std::time::Duration;

use taskflow_shared::db::migrations::run_migrations;
use taskflow_shared::db::pool::{create_pool, DatabaseConfig};
use taskflow_shared::models::membership::MembershipRole;
use taskflow_shared::models::project::{CreateProject, Project};
use taskflow_shared::models::task::{CreateTask, Task, TaskStatus, UpdateTask};
use taskflow_shared::models::user::{CreateUser, User};
use taskflow_shared::services::{activity, projects, tasks, users};
use taskflow_shared::store::postgres::PgStore;
use taskflow_shared::store::{Store, StoreTx};
use uuid::Uuid;

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = create_pool(DatabaseConfig {
        url,
        max_connections: 8,
        ..Default::default()
    })
    .await
    .unwrap();
    run_migrations(&pool).await.unwrap();
    PgStore::new(pool)
}

async fn register(tx: &mut dyn StoreTx, name: &str) -> User {
    users::register_user(
        tx,
        CreateUser::new(format!("{}-{}@example.com", name, Uuid::new_v4()), name),
    )
    .await
    .unwrap()
}

/// Positions per column of a project, each sorted
async fn columns(store: &PgStore, project_id: Uuid) -> BTreeMap<TaskStatus, Vec<i32>> {
    let mut tx = store.begin().await.unwrap();
    let mut columns: BTreeMap<TaskStatus, Vec<i32>> = BTreeMap::new();
    for task in tx.list_tasks(project_id).await.unwrap() {
        columns.entry(task.status).or_default().push(task.position);
    }
    for positions in columns.values_mut() {
        positions.sort_unstable();
    }
    columns
}

fn assert_dense(columns: &BTreeMap<TaskStatus, Vec<i32>>) {
    for (status, positions) in columns {
        let expected: Vec<i32> = (0..positions.len() as i32).collect();
        assert_eq!(positions, &expected, "column {} is not dense", status);
    }
}

/// todo = [A, B, X], in_progress = [P], plus a plain member
struct RaceBoard {
    owner: User,
    member: User,
    project: Project,
    x: Task,
}

impl RaceBoard {
    async fn new(store: &PgStore) -> Self {
        let mut tx = store.begin().await.unwrap();
        let owner = register(tx.as_mut(), "owner").await;
        let member = register(tx.as_mut(), "member").await;
        let project = projects::create_project(tx.as_mut(), owner.id, CreateProject::new("Race"))
            .await
            .unwrap();
        projects::invite_member(
            tx.as_mut(),
            owner.id,
            project.id,
            &member.email,
            MembershipRole::Member,
        )
        .await
        .unwrap();

        let mut created = Vec::new();
        for (title, status) in [
            ("A", TaskStatus::Todo),
            ("B", TaskStatus::Todo),
            ("X", TaskStatus::Todo),
            ("P", TaskStatus::InProgress),
        ] {
            let input = CreateTask {
                status,
                ..CreateTask::new(title)
            };
            created.push(
                tasks::create_task(tx.as_mut(), owner.id, project.id, input)
                    .await
                    .unwrap(),
            );
        }
        tx.commit().await.unwrap();

        Self {
            owner,
            member,
            project,
            x: created.swap_remove(2),
        }
    }

    async fn cleanup(&self, store: &PgStore) {
        let mut tx = store.begin().await.unwrap();
        projects::delete_project(tx.as_mut(), self.owner.id, self.project.id)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }
}

/// Holds an uncommitted move of X to the head of in_progress, runs `edit`
/// in a second transaction, then commits the move while the edit waits
async fn edit_during_reorder<F, Fut>(store: &PgStore, board: &RaceBoard, edit: F) -> Task
where
    F: FnOnce(PgStore) -> Fut,
    Fut: std::future::Future<Output = Task> + Send + 'static,
{
    let mut mover = store.begin().await.unwrap();
    tasks::reorder_task(mover.as_mut(), board.owner.id, board.x.id, TaskStatus::InProgress, 0)
        .await
        .unwrap();

    let editor = tokio::spawn(edit(store.clone()));
    tokio::time::sleep(Duration::from_millis(200)).await;
    mover.commit().await.unwrap();

    editor.await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_field_edit_during_reorder_keeps_the_move() {
    let store = store().await;
    let board = RaceBoard::new(&store).await;
    let (actor, task_id) = (board.owner.id, board.x.id);

    let edited = edit_during_reorder(&store, &board, move |store| async move {
        let mut tx = store.begin().await.unwrap();
        let update = UpdateTask {
            title: Some("X renamed".to_string()),
            ..Default::default()
        };
        let task = tasks::update_task(tx.as_mut(), actor, task_id, update)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        task
    })
    .await;

    assert_eq!(edited.title, "X renamed");
    assert_eq!(edited.status, TaskStatus::InProgress);
    assert_eq!(edited.position, 0);

    let columns = columns(&store, board.project.id).await;
    assert_eq!(columns[&TaskStatus::Todo], vec![0, 1]);
    assert_eq!(columns[&TaskStatus::InProgress], vec![0, 1]);
    assert_dense(&columns);

    board.cleanup(&store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_assignment_during_reorder_keeps_the_move() {
    let store = store().await;
    let board = RaceBoard::new(&store).await;
    let (actor, task_id, assignee) = (board.owner.id, board.x.id, board.member.id);

    let assigned = edit_during_reorder(&store, &board, move |store| async move {
        let mut tx = store.begin().await.unwrap();
        let task = tasks::assign_task(tx.as_mut(), actor, task_id, Some(assignee))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        task
    })
    .await;

    assert_eq!(assigned.assignee_id, Some(assignee));
    assert_eq!(assigned.status, TaskStatus::InProgress);
    assert_eq!(assigned.position, 0);

    let mut tx = store.begin().await.unwrap();
    let stored = tx.find_task(task_id).await.unwrap().unwrap();
    drop(tx);
    assert_eq!(stored.status, TaskStatus::InProgress);
    assert_eq!(stored.position, 0);
    assert_eq!(stored.assignee_id, Some(assignee));

    assert_dense(&columns(&store, board.project.id).await);

    board.cleanup(&store).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_recorded_activity_matches_stored_row() {
    let store = store().await;
    let board = RaceBoard::new(&store).await;

    let mut tx = store.begin().await.unwrap();
    let recorded = activity::record(
        tx.as_mut(),
        activity::task_created(board.owner.id, &board.x),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let feed = tx.list_activities(board.project.id, 100).await.unwrap();
    drop(tx);
    let stored = feed
        .iter()
        .find(|a| a.id == recorded.id)
        .expect("recorded activity is in the feed");
    assert_eq!(stored.created_at, recorded.created_at);

    board.cleanup(&store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_reorders_on_postgres_stay_dense() {
    let store = store().await;

    let mut tx = store.begin().await.unwrap();
    let owner = users::register_user(
        tx.as_mut(),
        CreateUser::new(format!("owner-{}@example.com", Uuid::new_v4()), "Owner"),
    )
    .await
    .unwrap();
    let project = projects::create_project(tx.as_mut(), owner.id, CreateProject::new("Race"))
        .await
        .unwrap();
    let mut ids = Vec::new();
    for i in 0..8 {
        let task = tasks::create_task(
            tx.as_mut(),
            owner.id,
            project.id,
            CreateTask::new(format!("task {}", i)),
        )
        .await
        .unwrap();
        ids.push(task.id);
    }
    tx.commit().await.unwrap();

    let mut handles = Vec::new();
    for (i, id) in ids.iter().copied().enumerate() {
        let store = store.clone();
        let actor = owner.id;
        let (status, position) = if i % 2 == 0 {
            (TaskStatus::Todo, 0)
        } else {
            (TaskStatus::InProgress, i as i32)
        };
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin().await.unwrap();
            tasks::reorder_task(tx.as_mut(), actor, id, status, position)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut tx = store.begin().await.unwrap();
    let all = tx.list_tasks(project.id).await.unwrap();
    assert_eq!(all.len(), ids.len());

    let mut columns: BTreeMap<TaskStatus, Vec<i32>> = BTreeMap::new();
    for task in &all {
        columns.entry(task.status).or_default().push(task.position);
    }
    for (status, mut positions) in columns {
        positions.sort_unstable();
        let expected: Vec<i32> = (0..positions.len() as i32).collect();
        assert_eq!(positions, expected, "column {} is not dense", status);
    }

    projects::delete_project(tx.as_mut(), owner.id, project.id)
        .await
        .unwrap();
    tx.commit().await.unwrap();
}

//! Kanban board behavior: reorder scenarios and column density

mod common;

use common::Board;
use taskflow_shared::error::CoreError;
use taskflow_shared::models::activity::ActivityKind;
use taskflow_shared::models::task::TaskStatus::{self, Done, InProgress, Review, Todo};
use taskflow_shared::services::tasks;
use taskflow_shared::store::Store;

#[tokio::test]
async fn test_move_up_within_column() {
    let board = Board::new().await;
    let t = board.tasks(Todo, &["A", "B", "C"]).await;

    let mut tx = board.store.begin().await.unwrap();
    let moved = tasks::reorder_task(tx.as_mut(), board.owner.id, t[1].id, Todo, 0)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(moved.position, 0);
    assert_eq!(board.column(Todo).await, vec!["B", "A", "C"]);
    board.assert_dense().await;
}

#[tokio::test]
async fn test_move_down_within_column() {
    let board = Board::new().await;
    let t = board.tasks(Todo, &["A", "B", "C", "D"]).await;

    let mut tx = board.store.begin().await.unwrap();
    tasks::reorder_task(tx.as_mut(), board.owner.id, t[0].id, Todo, 2)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(board.column(Todo).await, vec!["B", "C", "A", "D"]);
    board.assert_dense().await;
}

#[tokio::test]
async fn test_move_into_empty_column() {
    let board = Board::new().await;
    let t = board.tasks(Todo, &["A", "B", "C"]).await;

    let mut tx = board.store.begin().await.unwrap();
    let moved = tasks::reorder_task(tx.as_mut(), board.owner.id, t[2].id, InProgress, 0)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(moved.status, InProgress);
    assert_eq!(board.column(Todo).await, vec!["A", "B"]);
    assert_eq!(board.column(InProgress).await, vec!["C"]);
    board.assert_dense().await;
}

#[tokio::test]
async fn test_cross_column_conserves_counts() {
    let board = Board::new().await;
    let todo = board.tasks(Todo, &["A", "B", "C"]).await;
    board.tasks(Review, &["X", "Y"]).await;

    let mut tx = board.store.begin().await.unwrap();
    tasks::reorder_task(tx.as_mut(), board.owner.id, todo[0].id, Review, 1)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(board.column(Todo).await, vec!["B", "C"]);
    assert_eq!(board.column(Review).await, vec!["X", "A", "Y"]);
    board.assert_dense().await;
}

#[tokio::test]
async fn test_resubmitting_current_slot_writes_nothing() {
    let board = Board::new().await;
    let t = board.tasks(Todo, &["A", "B"]).await;
    let before = board.find(t[1].id).await;

    let mut tx = board.store.begin().await.unwrap();
    let same = tasks::reorder_task(tx.as_mut(), board.owner.id, t[1].id, Todo, 1)
        .await
        .unwrap();
    let feed = tx.list_activities(board.project.id, 100).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(same, before);
    assert!(feed.iter().all(|a| a.kind != ActivityKind::TaskStatusChanged));
}

#[tokio::test]
async fn test_position_past_end_is_clamped() {
    let board = Board::new().await;
    let t = board.tasks(Todo, &["A", "B", "C"]).await;

    let mut tx = board.store.begin().await.unwrap();
    let moved = tasks::reorder_task(tx.as_mut(), board.owner.id, t[0].id, Todo, 99)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(moved.position, 2);
    assert_eq!(board.column(Todo).await, vec!["B", "C", "A"]);
}

#[tokio::test]
async fn test_negative_position_is_rejected() {
    let board = Board::new().await;
    let t = board.tasks(Todo, &["A"]).await;

    let mut tx = board.store.begin().await.unwrap();
    let result = tasks::reorder_task(tx.as_mut(), board.owner.id, t[0].id, Todo, -1).await;
    assert!(matches!(result, Err(CoreError::Validation(_))));
}

#[tokio::test]
async fn test_change_status_appends_to_destination() {
    let board = Board::new().await;
    let todo = board.tasks(Todo, &["A", "B"]).await;
    board.tasks(Done, &["X", "Y"]).await;

    let mut tx = board.store.begin().await.unwrap();
    let moved = tasks::change_status(tx.as_mut(), board.owner.id, todo[0].id, Done)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(moved.position, 2);
    assert_eq!(board.column(Todo).await, vec!["B"]);
    assert_eq!(board.column(Done).await, vec!["X", "Y", "A"]);
    board.assert_dense().await;
}

#[tokio::test]
async fn test_delete_closes_gap() {
    let board = Board::new().await;
    let t = board.tasks(Todo, &["A", "B", "C"]).await;

    let mut tx = board.store.begin().await.unwrap();
    tasks::delete_task(tx.as_mut(), board.owner.id, t[0].id)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(board.column(Todo).await, vec!["B", "C"]);
    board.assert_dense().await;

    let c = board.find(t[2].id).await;
    assert_eq!(c.position, 1);
}

#[tokio::test]
async fn test_density_after_many_moves() {
    let board = Board::new().await;
    let mut ids = Vec::new();
    for (status, titles) in [
        (Todo, &["t0", "t1", "t2", "t3", "t4"][..]),
        (InProgress, &["p0", "p1", "p2"][..]),
        (Review, &["r0"][..]),
    ] {
        ids.extend(board.tasks(status, titles).await.into_iter().map(|t| t.id));
    }

    // deterministic walk over tasks, columns and positions
    let mut seed: u64 = 7;
    for _ in 0..60 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let task = ids[(seed >> 33) as usize % ids.len()];
        let status = TaskStatus::ALL[(seed >> 17) as usize % TaskStatus::ALL.len()];
        let position = ((seed >> 7) % 8) as i32;

        let mut tx = board.store.begin().await.unwrap();
        tasks::reorder_task(tx.as_mut(), board.owner.id, task, status, position)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    board.assert_dense().await;

    let mut tx = board.store.begin().await.unwrap();
    assert_eq!(tx.list_tasks(board.project.id).await.unwrap().len(), ids.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reorders_stay_dense() {
    let board = Board::new().await;
    let t = board.tasks(Todo, &["A", "B", "C", "D", "E", "F"]).await;

    let mut handles = Vec::new();
    for (i, task) in t.iter().enumerate() {
        let store = board.store.clone();
        let actor = board.owner.id;
        let task_id = task.id;
        let target = (t.len() - 1 - i) as i32;
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin().await.unwrap();
            tasks::reorder_task(tx.as_mut(), actor, task_id, Todo, target)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    board.assert_dense().await;
    assert_eq!(board.column(Todo).await.len(), 6);
}

#[tokio::test]
async fn test_failed_move_rolls_back() {
    let board = Board::new().await;
    let t = board.tasks(Todo, &["A", "B"]).await;
    let viewer = board
        .member("viewer", taskflow_shared::models::membership::MembershipRole::Viewer)
        .await;

    {
        let mut tx = board.store.begin().await.unwrap();
        let result = tasks::reorder_task(tx.as_mut(), viewer.id, t[1].id, Todo, 0).await;
        assert!(matches!(result, Err(CoreError::Forbidden(_))));
    }

    assert_eq!(board.column(Todo).await, vec!["A", "B"]);
}

//! Task position engine
//!
//! Keeps every column `(project_id, status)` densely packed: the tasks of a
//! column always hold positions `0..N-1`.
//!
//! A move is planned by [`plan_move`], a pure function returning the range
//! shifts that make room at the target and close the gap at the source. The
//! async helpers apply a plan through a [`StoreTx`]; callers must hold the
//! project's board lock ([`StoreTx::lock_project`]) and have re-read the
//! moved task after taking it.
//!
//! | Move | Shifts |
//! |---|---|
//! | same column, up (`new < old`) | `[new, old-1]` by +1 |
//! | same column, down (`new > old`) | `[old+1, new]` by -1 |
//! | same column, same slot | none |
//! | across columns | source `[old+1, ..]` by -1, target `[new, ..]` by +1 |

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::task::{Task, TaskStatus};
use crate::store::StoreTx;

/// Shift of a position range inside one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    /// Column
    pub status: TaskStatus,

    /// First position shifted
    pub from: i32,

    /// Last position shifted, `None` for the end of the column
    pub to: Option<i32>,

    /// +1 or -1
    pub delta: i32,
}

/// Plans the shifts for moving a task from `(old_status, old_position)` to
/// `(new_status, new_position)`
///
/// Positions are assumed to be already clamped to the column bounds. The
/// moved task itself is excluded when the shifts are applied.
pub fn plan_move(
    old_status: TaskStatus,
    old_position: i32,
    new_status: TaskStatus,
    new_position: i32,
) -> Vec<Shift> {
    if old_status == new_status {
        if new_position < old_position {
            vec![Shift {
                status: old_status,
                from: new_position,
                to: Some(old_position - 1),
                delta: 1,
            }]
        } else if new_position > old_position {
            vec![Shift {
                status: old_status,
                from: old_position + 1,
                to: Some(new_position),
                delta: -1,
            }]
        } else {
            Vec::new()
        }
    } else {
        vec![
            Shift {
                status: old_status,
                from: old_position + 1,
                to: None,
                delta: -1,
            },
            Shift {
                status: new_status,
                from: new_position,
                to: None,
                delta: 1,
            },
        ]
    }
}

/// Clamps a requested position to the last valid slot of the target column
///
/// `target_len` is the number of tasks currently in the target column. A
/// task staying in its column can reach `len - 1`; a task arriving from
/// another column can also take the new last slot, `len`.
pub fn clamp_position(same_column: bool, requested: i32, target_len: i64) -> i32 {
    let last = if same_column { target_len - 1 } else { target_len };
    let last = i32::try_from(last.max(0)).unwrap_or(i32::MAX);
    requested.clamp(0, last)
}

/// Position for a task appended to the end of a column
pub async fn append_position(
    tx: &mut dyn StoreTx,
    project_id: Uuid,
    status: TaskStatus,
) -> CoreResult<i32> {
    let len = tx.count_column(project_id, status).await?;
    i32::try_from(len).map_err(|_| CoreError::Validation("column is full".to_string()))
}

/// Moves `task` to `(new_status, requested_position)` and re-packs both
/// columns
///
/// On success `task` holds the stored state. Returns `false` when the task
/// already sits at the (clamped) target and nothing was written.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] for a negative position, or a store
/// error.
pub async fn move_task(
    tx: &mut dyn StoreTx,
    task: &mut Task,
    new_status: TaskStatus,
    requested_position: i32,
) -> CoreResult<bool> {
    if requested_position < 0 {
        return Err(CoreError::Validation(
            "position must be non-negative".to_string(),
        ));
    }

    let same_column = task.status == new_status;
    let target_len = tx.count_column(task.project_id, new_status).await?;
    let new_position = clamp_position(same_column, requested_position, target_len);

    if same_column && new_position == task.position {
        debug!(task_id = %task.id, "Task already at target position");
        return Ok(false);
    }

    let old_status = task.status;
    let old_position = task.position;

    task.status = new_status;
    task.position = new_position;
    task.updated_at = Utc::now();
    tx.place_task(task.id, new_status, new_position, task.updated_at)
        .await?;

    for shift in plan_move(old_status, old_position, new_status, new_position) {
        let shifted = tx
            .shift_positions(
                task.project_id,
                shift.status,
                shift.from,
                shift.to,
                shift.delta,
                Some(task.id),
            )
            .await?;
        debug!(
            task_id = %task.id,
            column = shift.status.as_str(),
            from = shift.from,
            to = ?shift.to,
            delta = shift.delta,
            shifted,
            "Shifted positions"
        );
    }

    Ok(true)
}

/// Closes the gap left by a task removed from `(status, position)`
pub async fn close_gap(
    tx: &mut dyn StoreTx,
    project_id: Uuid,
    status: TaskStatus,
    position: i32,
) -> CoreResult<()> {
    tx.shift_positions(project_id, status, position + 1, None, -1, None)
        .await?;
    Ok(())
}

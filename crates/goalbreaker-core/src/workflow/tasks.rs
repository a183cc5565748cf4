//! Task status updates.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use goalbreaker_db::models::TaskStatus;
use goalbreaker_db::queries::tasks as task_db;

use super::TaskView;
use crate::WorkflowError;

/// Parse a caller-supplied status string.
///
/// Only `pending` and `completed` are accepted.
pub fn parse_status(status: &str) -> Result<TaskStatus, WorkflowError> {
    status.parse().map_err(|_| {
        WorkflowError::Validation(
            "Invalid status. Must be 'pending' or 'completed'.".to_string(),
        )
    })
}

/// Set the status of one task. The owning goal and sibling tasks are not
/// touched.
///
/// The status is validated before storage is accessed.
pub async fn set_task_status(
    pool: &PgPool,
    task_id: Uuid,
    status: &str,
) -> Result<TaskView, WorkflowError> {
    let status = parse_status(status)?;

    let task = task_db::update_task_status(pool, task_id, status)
        .await?
        .ok_or_else(|| WorkflowError::not_found("task", task_id))?;

    info!(task_id = %task.id, goal_id = %task.goal_id, %status, "task status updated");
    Ok(task.into())
}

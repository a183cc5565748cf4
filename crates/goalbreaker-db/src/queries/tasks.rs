//! Database query functions for the `tasks` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{Task, TaskStatus};

/// Insert a new task row. Returns the inserted task with server-generated
/// defaults (id, timestamps, status `pending`).
///
/// `(goal_id, order_index)` is unique; inserting a duplicate index fails.
pub async fn insert_task<'e>(
    executor: impl PgExecutor<'e>,
    goal_id: Uuid,
    title: &str,
    order_index: i32,
) -> Result<Task> {
    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (goal_id, title, order_index) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(goal_id)
    .bind(title)
    .bind(order_index)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert task at position {order_index}"))?;

    Ok(task)
}

/// Fetch a single task by ID.
pub async fn get_task<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch task")?;

    Ok(task)
}

/// List all tasks for a goal, ordered by `order_index`.
pub async fn list_tasks_for_goal<'e>(
    executor: impl PgExecutor<'e>,
    goal_id: Uuid,
) -> Result<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE goal_id = $1 ORDER BY order_index ASC",
    )
    .bind(goal_id)
    .fetch_all(executor)
    .await
    .context("failed to list tasks for goal")?;

    Ok(tasks)
}

/// Delete every task belonging to a goal. Returns the number of rows removed.
pub async fn delete_tasks_for_goal<'e>(executor: impl PgExecutor<'e>, goal_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM tasks WHERE goal_id = $1")
        .bind(goal_id)
        .execute(executor)
        .await
        .context("failed to delete tasks for goal")?;

    Ok(result.rows_affected())
}

/// Set the status of a task and touch `updated_at`.
///
/// Returns the updated task, or `None` if no task has that ID.
pub async fn update_task_status<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    status: TaskStatus,
) -> Result<Option<Task>> {
    let task = sqlx::query_as::<_, Task>(
        "UPDATE tasks \
         SET status = $1, updated_at = now() \
         WHERE id = $2 \
         RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to update task status")?;

    Ok(task)
}

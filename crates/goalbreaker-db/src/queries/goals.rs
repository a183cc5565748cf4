//! Database query functions for the `goals` table.
//!
//! Every function is generic over [`PgExecutor`] so it runs equally against
//! the pool or inside a transaction (`&mut *tx`).

use anyhow::{Context, Result};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::Goal;

/// Insert a new goal row. Returns the inserted goal with server-generated
/// defaults (id, timestamps, `regenerated_count = 0`).
pub async fn insert_goal<'e>(
    executor: impl PgExecutor<'e>,
    goal_text: &str,
    complexity: i32,
) -> Result<Goal> {
    let goal = sqlx::query_as::<_, Goal>(
        "INSERT INTO goals (goal_text, complexity) \
         VALUES ($1, $2) \
         RETURNING *",
    )
    .bind(goal_text)
    .bind(complexity)
    .fetch_one(executor)
    .await
    .context("failed to insert goal")?;

    Ok(goal)
}

/// Fetch a goal by its ID.
pub async fn get_goal<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Goal>> {
    let goal = sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch goal")?;

    Ok(goal)
}

/// Fetch a goal and hold a row lock on it until the surrounding transaction
/// ends. Concurrent lockers of the same goal wait for each other.
pub async fn lock_goal<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Goal>> {
    let goal = sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to lock goal")?;

    Ok(goal)
}

/// List all goals, newest first.
pub async fn list_goals<'e>(executor: impl PgExecutor<'e>) -> Result<Vec<Goal>> {
    let goals = sqlx::query_as::<_, Goal>("SELECT * FROM goals ORDER BY created_at DESC, id")
        .fetch_all(executor)
        .await
        .context("failed to list goals")?;

    Ok(goals)
}

/// Record a completed regeneration: replace the complexity score, bump
/// `regenerated_count` by one, and touch `updated_at`.
///
/// Returns `None` if the goal does not exist.
pub async fn apply_regeneration<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    complexity: i32,
) -> Result<Option<Goal>> {
    let goal = sqlx::query_as::<_, Goal>(
        "UPDATE goals \
         SET complexity = $1, \
             regenerated_count = regenerated_count + 1, \
             updated_at = now() \
         WHERE id = $2 \
         RETURNING *",
    )
    .bind(complexity)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to apply goal regeneration")?;

    Ok(goal)
}

/// Delete a goal. Its tasks go with it (`ON DELETE CASCADE`).
///
/// Returns `true` if a row was deleted.
pub async fn delete_goal<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM goals WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete goal")?;

    Ok(result.rows_affected() > 0)
}

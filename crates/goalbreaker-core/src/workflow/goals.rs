//! Create, fetch, and regenerate goals.

use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use goalbreaker_db::queries::{goals as goal_db, tasks as task_db};

use super::GoalView;
use crate::WorkflowError;
use crate::generation::{Decomposition, GoalDecomposer};

/// Shortest accepted goal text, in characters.
pub const GOAL_TEXT_MIN_CHARS: usize = 3;

/// Longest accepted goal text, in characters.
pub const GOAL_TEXT_MAX_CHARS: usize = 200;

/// Check that `goal_text` is between 3 and 200 characters long.
pub fn validate_goal_text(goal_text: &str) -> Result<(), WorkflowError> {
    let len = goal_text.chars().count();
    if !(GOAL_TEXT_MIN_CHARS..=GOAL_TEXT_MAX_CHARS).contains(&len) {
        return Err(WorkflowError::Validation(format!(
            "goal must be between {GOAL_TEXT_MIN_CHARS} and {GOAL_TEXT_MAX_CHARS} characters (got {len})"
        )));
    }
    Ok(())
}

/// Decompose `goal_text` and persist the goal with its five tasks.
///
/// Nothing is written unless generation succeeds; the goal row and all task
/// rows are committed together.
pub async fn create_goal(
    pool: &PgPool,
    decomposer: &dyn GoalDecomposer,
    goal_text: &str,
) -> Result<GoalView, WorkflowError> {
    validate_goal_text(goal_text)?;

    let decomposition = generate(decomposer, goal_text).await?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let goal = goal_db::insert_goal(&mut *tx, goal_text, decomposition.complexity).await?;
    insert_steps(&mut *tx, goal.id, &decomposition).await?;

    let view = load_view(&mut *tx, goal.id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("goal", goal.id))?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        goal_id = %view.id,
        complexity = view.complexity,
        decomposer = decomposer.name(),
        "goal created"
    );
    Ok(view)
}

/// Fetch a goal with its tasks in order.
pub async fn get_goal(pool: &PgPool, goal_id: Uuid) -> Result<GoalView, WorkflowError> {
    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire connection")?;

    load_view(&mut *conn, goal_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("goal", goal_id))
}

/// Replace a goal's tasks with a fresh decomposition of its stored text.
///
/// Generation happens before any write. The replacement then runs in one
/// transaction holding a row lock on the goal: old tasks are deleted, five new
/// ones inserted at positions 0..4, the complexity replaced and
/// `regenerated_count` incremented. Concurrent regenerations of the same goal
/// apply one after the other. On any failure the goal is left untouched.
pub async fn regenerate_goal(
    pool: &PgPool,
    decomposer: &dyn GoalDecomposer,
    goal_id: Uuid,
) -> Result<GoalView, WorkflowError> {
    let goal = goal_db::get_goal(pool, goal_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("goal", goal_id))?;

    let decomposition = generate(decomposer, &goal.goal_text).await?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    // Deleted between the read above and now.
    if goal_db::lock_goal(&mut *tx, goal_id).await?.is_none() {
        return Err(WorkflowError::not_found("goal", goal_id));
    }

    let removed = task_db::delete_tasks_for_goal(&mut *tx, goal_id).await?;
    insert_steps(&mut *tx, goal_id, &decomposition).await?;
    goal_db::apply_regeneration(&mut *tx, goal_id, decomposition.complexity)
        .await?
        .ok_or_else(|| WorkflowError::not_found("goal", goal_id))?;

    let view = load_view(&mut *tx, goal_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("goal", goal_id))?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        goal_id = %goal_id,
        removed_tasks = removed,
        complexity = view.complexity,
        regenerated_count = view.regenerated_count,
        "goal regenerated"
    );
    Ok(view)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Call the decomposer and re-check its output against the contract.
async fn generate(
    decomposer: &dyn GoalDecomposer,
    goal_text: &str,
) -> Result<Decomposition, WorkflowError> {
    let result = decomposer.decompose(goal_text).await.and_then(|d| {
        d.validate()?;
        Ok(d)
    });

    result.map_err(|e| {
        warn!(decomposer = decomposer.name(), error = %e, "goal decomposition failed");
        WorkflowError::from(e)
    })
}

async fn insert_steps(
    conn: &mut PgConnection,
    goal_id: Uuid,
    decomposition: &Decomposition,
) -> Result<(), WorkflowError> {
    for (position, step) in (0i32..).zip(&decomposition.tasks) {
        task_db::insert_task(&mut *conn, goal_id, &step.title, position).await?;
    }
    Ok(())
}

async fn load_view(
    conn: &mut PgConnection,
    goal_id: Uuid,
) -> Result<Option<GoalView>, WorkflowError> {
    let Some(goal) = goal_db::get_goal(&mut *conn, goal_id).await? else {
        return Ok(None);
    };
    let tasks = task_db::list_tasks_for_goal(&mut *conn, goal_id).await?;
    Ok(Some(GoalView::assemble(goal, tasks)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_text_length_bounds() {
        assert!(validate_goal_text("ab").is_err());
        assert!(validate_goal_text("").is_err());
        assert!(validate_goal_text("abc").is_ok());
        assert!(validate_goal_text(&"x".repeat(200)).is_ok());
        assert!(validate_goal_text(&"x".repeat(201)).is_err());
    }

    #[test]
    fn goal_text_counts_characters_not_bytes() {
        // Three characters, nine bytes.
        assert!(validate_goal_text("日本語").is_ok());
        // 200 two-byte characters.
        assert!(validate_goal_text(&"é".repeat(200)).is_ok());
    }

    #[test]
    fn goal_text_error_is_validation() {
        let err = validate_goal_text("hi").unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(err.to_string().contains("between 3 and 200"));
    }
}

//! Operator-mode CLI handlers for `goalbreaker goal` and `goalbreaker task`.
//!
//! Implements:
//! - `goalbreaker goal create <text>`      -- decompose and store a new goal
//! - `goalbreaker goal show <goal-id>`     -- print a goal with its tasks
//! - `goalbreaker goal regenerate <id>`    -- replace a goal's tasks
//! - `goalbreaker goal list`               -- list all goals
//! - `goalbreaker goal delete <goal-id>`   -- delete a goal and its tasks
//! - `goalbreaker task status <id> <s>`    -- mark a task pending/completed

use std::fmt::Write as _;

use anyhow::{Context, Result, anyhow};
use sqlx::PgPool;
use uuid::Uuid;

use goalbreaker_core::generation::GoalDecomposer;
use goalbreaker_core::workflow::{self, GoalView};
use goalbreaker_db::models::TaskStatus;
use goalbreaker_db::queries::goals as goal_queries;

use crate::{GoalCommands, TaskCommands};

// -----------------------------------------------------------------------
// Public entry points
// -----------------------------------------------------------------------

/// Dispatch a `GoalCommands` variant to the appropriate handler.
///
/// `decomposer` is only required by the commands that call the generation
/// service (see [`GoalCommands::needs_generation`]).
pub async fn run_goal_command(
    command: GoalCommands,
    pool: &PgPool,
    decomposer: Option<&dyn GoalDecomposer>,
) -> Result<()> {
    match command {
        GoalCommands::Create { text } => cmd_create(pool, require(decomposer)?, &text).await,
        GoalCommands::Show { goal_id } => cmd_show(pool, &goal_id).await,
        GoalCommands::Regenerate { goal_id } => {
            cmd_regenerate(pool, require(decomposer)?, &goal_id).await
        }
        GoalCommands::List => cmd_list(pool).await,
        GoalCommands::Delete { goal_id } => cmd_delete(pool, &goal_id).await,
    }
}

/// Dispatch a `TaskCommands` variant to the appropriate handler.
pub async fn run_task_command(command: TaskCommands, pool: &PgPool) -> Result<()> {
    match command {
        TaskCommands::Status { task_id, status } => cmd_task_status(pool, &task_id, &status).await,
    }
}

fn require(decomposer: Option<&dyn GoalDecomposer>) -> Result<&dyn GoalDecomposer> {
    decomposer.ok_or_else(|| anyhow!("this command needs the generation service configured"))
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse()
        .with_context(|| format!("invalid {what} ID: {raw:?}"))
}

// -----------------------------------------------------------------------
// goal create / show / regenerate
// -----------------------------------------------------------------------

async fn cmd_create(pool: &PgPool, decomposer: &dyn GoalDecomposer, text: &str) -> Result<()> {
    let view = workflow::create_goal(pool, decomposer, text).await?;
    println!("Goal created.");
    println!();
    print!("{}", render_goal(&view));
    Ok(())
}

async fn cmd_show(pool: &PgPool, goal_id: &str) -> Result<()> {
    let id = parse_id(goal_id, "goal")?;
    let view = workflow::get_goal(pool, id).await?;
    print!("{}", render_goal(&view));
    Ok(())
}

async fn cmd_regenerate(
    pool: &PgPool,
    decomposer: &dyn GoalDecomposer,
    goal_id: &str,
) -> Result<()> {
    let id = parse_id(goal_id, "goal")?;
    let view = workflow::regenerate_goal(pool, decomposer, id).await?;
    println!("Goal regenerated.");
    println!();
    print!("{}", render_goal(&view));
    Ok(())
}

/// Render a goal view as a human-readable block.
fn render_goal(view: &GoalView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Goal ID:       {}", view.id);
    let _ = writeln!(out, "  Goal:          {}", view.goal_text);
    let _ = writeln!(out, "  Complexity:    {}/10", view.complexity);
    let _ = writeln!(out, "  Regenerated:   {}", view.regenerated_count);
    let _ = writeln!(out);
    for (n, task) in view.tasks.iter().enumerate() {
        let mark = match task.status {
            TaskStatus::Completed => "x",
            TaskStatus::Pending => " ",
        };
        let _ = writeln!(out, "  {}. [{mark}] {}  ({})", n + 1, task.title, task.id);
    }
    out
}

// -----------------------------------------------------------------------
// goal list / delete
// -----------------------------------------------------------------------

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let goals = goal_queries::list_goals(pool).await?;

    if goals.is_empty() {
        println!("No goals found. Use `goalbreaker goal create <text>` to create one.");
        return Ok(());
    }

    println!("{:<36}  {:>10}  {:>5}  GOAL", "ID", "COMPLEXITY", "REGEN");
    for goal in &goals {
        println!(
            "{:<36}  {:>10}  {:>5}  {}",
            goal.id, goal.complexity, goal.regenerated_count, goal.goal_text
        );
    }
    println!();
    println!("{} goal(s).", goals.len());
    Ok(())
}

async fn cmd_delete(pool: &PgPool, goal_id: &str) -> Result<()> {
    let id = parse_id(goal_id, "goal")?;
    if !goal_queries::delete_goal(pool, id).await? {
        anyhow::bail!("goal {id} not found");
    }
    tracing::info!(goal_id = %id, "goal deleted");
    println!("Goal {id} deleted.");
    Ok(())
}

// -----------------------------------------------------------------------
// task status
// -----------------------------------------------------------------------

async fn cmd_task_status(pool: &PgPool, task_id: &str, status: &str) -> Result<()> {
    let id = parse_id(task_id, "task")?;
    let view = workflow::set_task_status(pool, id, status).await?;
    println!("Task {} ({}) is now {}.", view.id, view.title, view.status);
    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

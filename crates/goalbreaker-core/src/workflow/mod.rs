//! Goal and task workflows.
//!
//! Each operation validates its input, talks to the generation service where
//! needed, and applies its writes inside one database transaction. Returned
//! views are read back from storage inside that transaction, so they reflect
//! exactly what was committed.

pub mod goals;
pub mod tasks;
pub mod view;

pub use goals::{
    GOAL_TEXT_MAX_CHARS, GOAL_TEXT_MIN_CHARS, create_goal, get_goal, regenerate_goal,
    validate_goal_text,
};
pub use tasks::{parse_status, set_task_status};
pub use view::{GoalView, TaskView};

//! Response shapes returned by the workflows.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use goalbreaker_db::models::{Goal, Task, TaskStatus};

/// A task as presented to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
}

impl From<Task> for TaskView {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            title: t.title,
            status: t.status,
        }
    }
}

/// A goal with its tasks in `order_index` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalView {
    pub id: Uuid,
    pub goal_text: String,
    pub complexity: i32,
    pub regenerated_count: i32,
    pub tasks: Vec<TaskView>,
}

impl GoalView {
    /// Combine a goal row with its task rows, whatever order they arrived in.
    pub fn assemble(goal: Goal, mut tasks: Vec<Task>) -> Self {
        tasks.sort_by_key(|t| t.order_index);
        Self {
            id: goal.id,
            goal_text: goal.goal_text,
            complexity: goal.complexity,
            regenerated_count: goal.regenerated_count,
            tasks: tasks.into_iter().map(TaskView::from).collect(),
        }
    }
}

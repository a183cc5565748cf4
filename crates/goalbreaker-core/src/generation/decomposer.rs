//! The `GoalDecomposer` trait -- the seam between the workflows and the
//! generation service.
//!
//! The workflows take `&dyn GoalDecomposer`, so the trait stays object safe.
//! Production uses [`super::GeminiClient`]; tests substitute a stub.

use async_trait::async_trait;

use super::{Decomposition, GenerationError};

/// Produces a [`Decomposition`] for a goal.
///
/// Callers validate the goal text length before calling. Implementations
/// should return output that passes [`Decomposition::validate`]; the
/// workflows re-check it regardless.
#[async_trait]
pub trait GoalDecomposer: Send + Sync {
    /// Short identifier for logs (e.g. the model name).
    fn name(&self) -> &str;

    /// Decompose `goal_text` into a complexity score and five steps.
    async fn decompose(&self, goal_text: &str) -> Result<Decomposition, GenerationError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn GoalDecomposer) {}
};

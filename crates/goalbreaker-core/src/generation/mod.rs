//! Generation client: turns a goal into a complexity score and five steps.

pub mod decomposer;
pub mod decomposition;
pub mod error;
pub mod gemini;
pub mod prompt;

pub use decomposer::GoalDecomposer;
pub use decomposition::{COMPLEXITY_RANGE, Decomposition, STEP_COUNT, StepDraft};
pub use error::GenerationError;
pub use gemini::{GeminiClient, GeminiConfig};
pub use prompt::{build_prompt, response_schema};

//! The structured result of decomposing a goal.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::GenerationError;

/// Number of steps every decomposition must contain.
pub const STEP_COUNT: usize = 5;

/// Allowed complexity scores: 1 (trivial) to 10 (highly complex).
pub const COMPLEXITY_RANGE: RangeInclusive<i32> = 1..=10;

/// One generated step, before it is persisted as a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDraft {
    pub title: String,
}

/// A complexity score plus exactly [`STEP_COUNT`] ordered steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    pub complexity: i32,
    pub tasks: Vec<StepDraft>,
}

impl Decomposition {
    /// Parse raw model output and check it against the contract.
    ///
    /// Unknown fields are ignored; missing or mistyped fields are
    /// [`GenerationError::MalformedJson`], contract violations are
    /// [`GenerationError::Schema`].
    pub fn parse(raw: &str) -> Result<Self, GenerationError> {
        let decomposition: Self = serde_json::from_str(raw.trim())?;
        decomposition.validate()?;
        Ok(decomposition)
    }

    /// Check the step count and complexity range, and that every title is
    /// non-blank and storable.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.tasks.len() != STEP_COUNT {
            return Err(GenerationError::Schema(format!(
                "expected exactly {STEP_COUNT} tasks, got {}",
                self.tasks.len()
            )));
        }
        if !COMPLEXITY_RANGE.contains(&self.complexity) {
            return Err(GenerationError::Schema(format!(
                "complexity {} is outside {}..={}",
                self.complexity,
                COMPLEXITY_RANGE.start(),
                COMPLEXITY_RANGE.end()
            )));
        }
        if let Some(pos) = self.tasks.iter().position(|t| t.title.trim().is_empty()) {
            return Err(GenerationError::Schema(format!("task {} has an empty title", pos + 1)));
        }
        // Postgres text columns cannot store NUL.
        if let Some(pos) = self.tasks.iter().position(|t| t.title.contains('\0')) {
            return Err(GenerationError::Schema(format!(
                "task {} title contains a NUL character",
                pos + 1
            )));
        }
        Ok(())
    }
}

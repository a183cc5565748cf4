use thiserror::Error;

use crate::generation::GenerationError;

/// Outcome of a failed workflow operation.
///
/// The variants map one-to-one onto API status codes: validation 400,
/// not-found 404, generation and storage 500.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("failed to generate goal steps: {0}")]
    Generation(#[from] GenerationError),

    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<anyhow::Error> for WorkflowError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity() {
        let err = WorkflowError::not_found("goal", "abc");
        assert_eq!(err.to_string(), "goal abc not found");
    }

    #[test]
    fn storage_message_includes_context_chain() {
        let inner = anyhow::anyhow!("connection reset").context("failed to insert goal");
        let err = WorkflowError::from(inner);
        assert_eq!(
            err.to_string(),
            "storage error: failed to insert goal: connection reset"
        );
    }
}

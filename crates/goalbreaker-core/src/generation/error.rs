use std::time::Duration;

use thiserror::Error;

/// Failure to obtain a conforming decomposition from the generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request to generation service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("generation service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("generation service returned no content")]
    EmptyResponse,

    #[error("generation output is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("generation output does not match the expected shape: {0}")]
    Schema(String),
}

impl GenerationError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            Self::EmptyResponse | Self::MalformedJson(_) | Self::Schema(_) => false,
        }
    }
}

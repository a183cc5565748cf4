//! Gemini `generateContent` client.
//!
//! Sends the decomposition prompt with `temperature = 0` and a structured
//! output schema, then parses the first candidate's text as a
//! [`Decomposition`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{Decomposition, GenerationError, GoalDecomposer, build_prompt, response_schema};

/// Settings for [`GeminiClient`].
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// API root, without a trailing slash (e.g. `.../v1beta`).
    pub base_url: String,
    /// Upper bound for a single HTTP attempt.
    pub timeout: Duration,
    /// Extra attempts after a transient failure. `0` means a single attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_backoff: Duration,
}

impl GeminiConfig {
    pub const DEFAULT_MODEL: &str = "gemini-flash-latest";
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

    /// Defaults for everything except the API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            max_retries: 0,
            retry_backoff: Self::DEFAULT_RETRY_BACKOFF,
        }
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Wire types (only the fields we read)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`GoalDecomposer`] backed by the Gemini API.
pub struct GeminiClient {
    config: GeminiConfig,
    http: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn request_body(goal_text: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": build_prompt(goal_text) }],
            }],
            "generationConfig": {
                "temperature": 0,
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        })
    }

    /// One HTTP round trip, returning the model's raw text.
    async fn attempt(&self, body: &serde_json::Value) -> Result<String, GenerationError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: GenerateContentResponse =
            response.json().await.map_err(|e| self.classify(e))?;

        let text: String = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }

    fn classify(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.config.timeout)
        } else {
            GenerationError::Transport(err)
        }
    }
}

#[async_trait]
impl GoalDecomposer for GeminiClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn decompose(&self, goal_text: &str) -> Result<Decomposition, GenerationError> {
        let body = Self::request_body(goal_text);

        let mut attempt = 0u32;
        let raw = loop {
            if attempt > 0 {
                let backoff = self
                    .config
                    .retry_backoff
                    .saturating_mul(2u32.saturating_pow(attempt - 1));
                warn!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "retrying generation after transient error"
                );
                tokio::time::sleep(backoff).await;
            }

            match self.attempt(&body).await {
                Ok(raw) => break raw,
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    debug!(attempt, error = %e, "generation attempt failed");
                    attempt += 1;
                }
                Err(e) => {
                    warn!(model = %self.config.model, error = %e, "generation failed");
                    return Err(e);
                }
            }
        };

        let decomposition = Decomposition::parse(&raw)?;
        info!(
            model = %self.config.model,
            complexity = decomposition.complexity,
            "goal decomposed"
        );
        Ok(decomposition)
    }
}

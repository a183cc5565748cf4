//! Prompt and structured-output schema for the decomposition request.
//!
//! Pure functions: the same goal text always yields the same prompt.

use serde_json::{Value, json};

use super::{COMPLEXITY_RANGE, STEP_COUNT};

/// Build the instruction prompt for `goal_text`.
pub fn build_prompt(goal_text: &str) -> String {
    let min = COMPLEXITY_RANGE.start();
    let max = COMPLEXITY_RANGE.end();

    let mut prompt = String::with_capacity(1024);
    prompt.push_str(
        "You are an expert project manager and strategist. Your task is to break down \
         a user's vague goal into exactly ",
    );
    prompt.push_str(&format!(
        "{STEP_COUNT} simple, actionable, and sequential steps.\n\n"
    ));
    prompt.push_str(&format!("The user's goal is: **\"{goal_text}\"**\n\n"));
    prompt.push_str("Return a single, valid JSON object.\n\n");
    prompt.push_str("### Rules\n");
    prompt.push_str(&format!(
        "- The `complexity` score must be an integer between {min} (very simple) and {max} (highly complex).\n"
    ));
    prompt.push_str(&format!(
        "- The `tasks` array must contain exactly {STEP_COUNT} task objects, in the order they should be done.\n"
    ));
    prompt.push_str("- Each task `title` should be a clear, concise action item.\n");
    prompt.push_str(
        "- Do not add any extra commentary or text outside of the final JSON object.\n",
    );
    prompt
}

/// Structured-output schema constraining the model's reply.
///
/// Uses the OpenAPI-subset dialect of the Gemini `responseSchema` field.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "complexity": {
                "type": "INTEGER",
                "minimum": COMPLEXITY_RANGE.start(),
                "maximum": COMPLEXITY_RANGE.end(),
            },
            "tasks": {
                "type": "ARRAY",
                "minItems": STEP_COUNT,
                "maxItems": STEP_COUNT,
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" }
                    },
                    "required": ["title"],
                },
            },
        },
        "required": ["complexity", "tasks"],
        "propertyOrdering": ["complexity", "tasks"],
    })
}

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use goalbreaker_core::WorkflowError;
use goalbreaker_core::generation::GoalDecomposer;
use goalbreaker_core::workflow::{self, GoalView, TaskView};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub decomposer: Arc<dyn GoalDecomposer>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(entity: &str) -> Self {
        let mut chars = entity.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{capitalized} not found"),
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(msg) => Self::bad_request(msg),
            WorkflowError::NotFound { entity, .. } => Self::not_found(entity),
            err @ (WorkflowError::Generation(_) | WorkflowError::Storage(_)) => {
                tracing::error!(error = %err, "request failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "detail": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// A path segment that is not a UUID cannot name a stored record.
fn parse_id(raw: &str, entity: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(entity))
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub goal: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub status: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/goals", post(create_goal))
        .route("/goals/", post(create_goal))
        .route("/goals/{goal_id}", get(get_goal))
        .route("/goals/{goal_id}/regenerate", post(regenerate_goal))
        .route("/tasks/{task_id}", patch(update_task))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let decomposer = state.decomposer.name().to_string();
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(%decomposer, "goalbreaker serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("goalbreaker serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to the Smart Goal Breaker API!" }))
}

async fn create_goal(
    State(state): State<AppState>,
    payload: Result<Json<CreateGoalRequest>, JsonRejection>,
) -> Result<Json<GoalView>, AppError> {
    let Json(request) = payload?;
    let view = workflow::create_goal(&state.pool, state.decomposer.as_ref(), &request.goal).await?;
    Ok(Json(view))
}

async fn get_goal(
    State(state): State<AppState>,
    Path(goal_id): Path<String>,
) -> Result<Json<GoalView>, AppError> {
    let id = parse_id(&goal_id, "goal")?;
    let view = workflow::get_goal(&state.pool, id).await?;
    Ok(Json(view))
}

async fn regenerate_goal(
    State(state): State<AppState>,
    Path(goal_id): Path<String>,
) -> Result<Json<GoalView>, AppError> {
    let id = parse_id(&goal_id, "goal")?;
    let view = workflow::regenerate_goal(&state.pool, state.decomposer.as_ref(), id).await?;
    Ok(Json(view))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskView>, AppError> {
    let Json(request) = payload?;
    let id = parse_id(&task_id, "task")?;
    let view = workflow::set_task_status(&state.pool, id, &request.status).await?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

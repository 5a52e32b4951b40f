//! API routes for examd

use crate::error::ApiError;
use crate::network::middleware::{rate_limit_middleware, RateLimitGate};
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::header,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use exam_common::{Fingerprint, GeneratedTask};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Task Routes
// ============================================================================

/// `/get_task`, gated by the generation budget
pub fn task_routes(generation_gate: RateLimitGate) -> Router<AppStateArc> {
    Router::new()
        .route("/get_task", get(get_task))
        .route_layer(middleware::from_fn_with_state(
            generation_gate,
            rate_limit_middleware,
        ))
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub subject: Option<String>,
}

async fn get_task(
    State(state): State<AppStateArc>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<GeneratedTask>, ApiError> {
    let subject = query
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(state.config.server.default_subject.as_str());

    debug!("Generating task for '{}'", subject);
    let task = state.generator.generate(subject).await?;
    Ok(Json(task))
}

// ============================================================================
// Lookup Routes
// ============================================================================

pub fn lookup_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/tasks/:fingerprint", get(get_stored_task))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoredTaskResponse {
    pub fingerprint: Fingerprint,
    pub task: String,
    pub answer: String,
}

async fn get_stored_task(
    State(state): State<AppStateArc>,
    Path(raw): Path<String>,
) -> Result<Json<StoredTaskResponse>, ApiError> {
    let fp = Fingerprint::parse(&raw)
        .ok_or_else(|| ApiError::NotFound(format!("no task with fingerprint '{}'", raw)))?;

    let record = state
        .generator
        .cache()
        .get(&fp)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("no task with fingerprint '{}'", fp)))?;

    Ok(Json(StoredTaskResponse {
        fingerprint: record.fingerprint,
        task: record.task_text,
        answer: record.answer,
    }))
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub cached_tasks: Option<u64>,
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let cached_tasks = match state.generator.cache().count().await {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("Health check could not count cached tasks: {}", e);
            None
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        cached_tasks,
    })
}

// ============================================================================
// Metrics Routes
// ============================================================================

pub fn metrics_routes() -> Router<AppStateArc> {
    Router::new().route("/metrics", get(render_metrics))
}

async fn render_metrics(State(state): State<AppStateArc>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {}", e)))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

//! Error taxonomy for examd and its HTTP mapping
//!
//! Provider and cache failures are recovered inside the generator. Only
//! admission and resolution failures ever reach a client.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use exam_common::{SolveError, TaskTextError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Stable failure names used in JSON bodies and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AdmissionDenied,
    MalformedTask,
    EngineUnavailable,
    Timeout,
    CacheUnavailable,
    ProviderUnavailable,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AdmissionDenied => "admission_denied",
            ErrorKind::MalformedTask => "malformed_task",
            ErrorKind::EngineUnavailable => "engine_unavailable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::CacheUnavailable => "cache_unavailable",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Inference engine failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("inference engine unavailable: {0}")]
    Unavailable(String),

    #[error("inference engine timed out after {0:?}")]
    Timeout(Duration),
}

/// Answer resolution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("malformed task: {0}")]
    MalformedTask(String),

    #[error("answer engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("answer engine timed out after {0:?}")]
    Timeout(Duration),
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::MalformedTask(_) => ErrorKind::MalformedTask,
            ResolveError::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            ResolveError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

impl From<TaskTextError> for ResolveError {
    fn from(e: TaskTextError) -> Self {
        ResolveError::MalformedTask(e.to_string())
    }
}

impl From<SolveError> for ResolveError {
    fn from(e: SolveError) -> Self {
        ResolveError::MalformedTask(e.to_string())
    }
}

impl From<EngineError> for ResolveError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Unavailable(msg) => ResolveError::EngineUnavailable(msg),
            EngineError::Timeout(after) => ResolveError::Timeout(after),
        }
    }
}

/// Task source failures (recovered with a fallback task)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("task source unavailable: {0}")]
    Unavailable(String),

    #[error("task source timed out after {0:?}")]
    Timeout(Duration),
}

/// Task generation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("could not resolve an answer: {0}")]
    ResolutionFailed(#[from] ResolveError),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::ResolutionFailed(e) => e.kind(),
        }
    }
}

/// Errors returned by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limit exceeded for {budget} budget, retry in {retry_after:?}")]
    AdmissionDenied {
        budget: &'static str,
        retry_after: Duration,
    },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::AdmissionDenied { .. } => ErrorKind::AdmissionDenied,
            ApiError::Generation(e) => e.kind(),
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::AdmissionDenied => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::EngineUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MalformedTask
            | ErrorKind::CacheUnavailable
            | ErrorKind::ProviderUnavailable
            | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Whole seconds for a Retry-After header, never zero
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    retry_after.as_secs_f64().ceil().max(1.0) as u64
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed ({}): {}", self.kind().as_str(), self);
        }

        let retry_after = match &self {
            ApiError::AdmissionDenied { retry_after, .. } => Some(retry_after_secs(*retry_after)),
            _ => None,
        };

        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            retry_after_secs: retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

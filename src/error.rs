use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Core error taxonomy (see spec §7). Only these variants are allowed to cross the
/// orchestrator boundary as an `Err`; every other failure (maps/LLM/cache outages,
/// JSON parse failures) is caught by the owning component and converted into a typed
/// fallback value instead.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("rate limited")]
    RateLimited { retry_reply: String },

    #[error("{component} unavailable: {message}")]
    UpstreamUnavailable { component: &'static str, message: String },

    #[error("failed to parse {call} response")]
    ParseFailure { call: &'static str, raw: String },

    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            CoreError::InputInvalid(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "input_invalid", "message": msg }),
            ),
            CoreError::RateLimited { retry_reply } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "rate_limited", "reply": retry_reply }),
            ),
            CoreError::UpstreamUnavailable { component, message } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "upstream_unavailable", "component": component, "message": message }),
            ),
            CoreError::ParseFailure { call, .. } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": "parse_failure", "call": call }),
            ),
            CoreError::StateConflict(msg) => (
                StatusCode::CONFLICT,
                json!({ "error": "state_conflict", "message": msg }),
            ),
            CoreError::NotFound { kind, id } => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "kind": kind, "id": id }),
            ),
            CoreError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "internal", "message": "an unexpected error occurred" }),
            ),
        };

        if matches!(self, CoreError::Internal(_)) {
            tracing::error!(error = %self, "fatal error reached HTTP boundary");
        } else {
            tracing::warn!(error = %self, "request failed");
        }

        (status, Json(body)).into_response()
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

// huntwarden/src/error.rs
//
// Error taxonomy for the service layer.
//
// Heuristics do not fail: they fall back to documented neutral values and log.
// What can fail is I/O at the edges (LLM HTTP calls, the clue cache, Redis,
// the audit log). Handlers surface anything that escapes as
// `500 {"detail": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} is not configured (missing API key)")]
    NotConfigured { provider: &'static str },

    #[error("{provider} request failed: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source:   reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status { provider: &'static str, status: u16, body: String },

    #[error("{provider} returned no usable text")]
    EmptyResponse { provider: &'static str },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache payload: {0}")]
    Codec(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        let body = serde_json::json!({ "detail": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

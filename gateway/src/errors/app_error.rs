//! Handler-level errors and their HTTP mapping.
//!
//! Synthesis failures that happen before the first audio byte become a JSON
//! error response with a status chosen from the error kind. Later failures
//! never reach this type; the body stream just ends.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::core::tts::TTSError;

/// Message returned when the upstream credentials are not configured.
pub const MISSING_CREDENTIALS_MESSAGE: &str = "Server isn't configured: missing APPID/TOKEN env";

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid request body.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// App id or access token missing; no upstream connection is attempted.
    #[error("Server isn't configured: missing APPID/TOKEN env")]
    MissingCredentials,

    /// No in-flight stream for the requested session id.
    #[error("session not found")]
    SessionNotFound,

    /// The synthesis stream failed before producing any audio.
    #[error(transparent)]
    Synthesis(#[from] TTSError),
}

/// Result type for handlers.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MissingCredentials => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SessionNotFound => StatusCode::NOT_FOUND,
            AppError::Synthesis(err) => match err {
                TTSError::UpstreamAuth { .. } => StatusCode::UNAUTHORIZED,
                TTSError::UpstreamRequest { .. } => StatusCode::BAD_REQUEST,
                TTSError::ConnectionFailed(_) => StatusCode::BAD_GATEWAY,
                TTSError::InvalidConfiguration(_)
                | TTSError::MalformedFrame(_)
                | TTSError::DecompressionFailed(_)
                | TTSError::EncodingFailed(_)
                | TTSError::ProtocolViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            AppError::SessionNotFound => json!({ "ok": false, "error": "session not found" }),
            AppError::BadRequest(msg) => json!({ "error": msg }),
            AppError::MissingCredentials => json!({ "error": MISSING_CREDENTIALS_MESSAGE }),
            AppError::Synthesis(err) => match err.upstream_code() {
                Some(code) => json!({ "error": err.detail(), "code": code }),
                None => json!({ "error": err.detail() }),
            },
        };

        (status, Json(body)).into_response()
    }
}

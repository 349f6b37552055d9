//! # Error Handling
//!
//! Custom error types and their conversion to HTTP responses.
//!
//! ## Error Categories:
//! - **Unauthorized/Forbidden**: Auth gate failures (401/403)
//! - **BadRequest**: Malformed upload payloads (400)
//! - **Engine**: Transcription failures on otherwise valid requests (500)
//! - **Internal**: Everything else server-side (500)
//!
//! All responses share one JSON envelope so API clients can branch on the
//! machine-readable `type` field.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// Authorization header missing or not a bearer credential
    Unauthorized(String),

    /// Bearer token present but does not match the configured secret
    Forbidden(String),

    /// Client sent an invalid or oversized upload
    BadRequest(String),

    /// The speech engine rejected or failed on the uploaded audio
    Engine(String),

    /// Server-side failures (temp file I/O, blocking pool, etc.)
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Engine(msg) => write!(f, "Transcription error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Maps each error variant to an HTTP status, a machine-readable type tag,
/// and the human-readable message.
///
/// ## JSON Response Format:
/// ```json
/// {
///   "error": {
///     "type": "forbidden",
///     "message": "invalid token",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::Unauthorized(msg) => (
                actix_web::http::StatusCode::UNAUTHORIZED,
                "unauthorized",
                msg.clone(),
            ),
            AppError::Forbidden(msg) => (
                actix_web::http::StatusCode::FORBIDDEN,
                "forbidden",
                msg.clone(),
            ),
            AppError::BadRequest(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "bad_request",
                msg.clone(),
            ),
            AppError::Engine(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "engine_error",
                msg.clone(),
            ),
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

/// Fallible internals use anyhow; anything reaching the HTTP boundary
/// untyped is a server error.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

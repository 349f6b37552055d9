//! Bearer-token gate for the transcription endpoint.
//!
//! With no token configured the gate is a no-op. Otherwise a request must
//! carry `Authorization: Bearer <token>`: a missing or malformed header is
//! 401, a present-but-wrong token is 403.

use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Validate an Authorization header value against the configured secret.
///
/// Token comparison is plain string equality, not a constant-time compare.
pub fn check_bearer(configured: Option<&str>, header: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = configured else {
        return Ok(());
    };

    let token = header
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| {
            AppError::Unauthorized("missing or invalid Authorization header".to_string())
        })?;

    if token.trim() != expected {
        return Err(AppError::Forbidden("invalid token".to_string()));
    }

    Ok(())
}

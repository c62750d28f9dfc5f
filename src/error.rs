//! Error handling module
//!
//! Provides the single error type surfaced by the remote client and every
//! view model. The `Display` form of each variant is the message shown inline
//! next to the action that failed.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Shown when neither the server body nor the status line carries a message.
pub const GENERIC_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// 401/403 on an authenticated request. The session is no longer usable.
    #[error("{0}")]
    Unauthorized(String),

    /// Local role gate (e.g. a non-admin trying to drop a table).
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Session storage error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error body shape the backend is expected to send.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl AppError {
    /// Build an error from a failed response.
    ///
    /// The message comes from the body's `message` field, then the status
    /// text, then [`GENERIC_ERROR_MESSAGE`]. When `authenticated` is set, 401
    /// and 403 become [`AppError::Unauthorized`].
    pub fn from_response(status: StatusCode, body: &str, authenticated: bool) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());

        if authenticated && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            AppError::Unauthorized(message)
        } else {
            AppError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }

    /// True when the error means the current session must be dropped.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized(_))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Api { status, .. } => Some(*status),
            AppError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = first_validation_message(&errors).unwrap_or_else(|| errors.to_string());
        AppError::Validation(message)
    }
}

/// First human-readable message anywhere in a (possibly nested) error tree
fn first_validation_message(errors: &validator::ValidationErrors) -> Option<String> {
    use validator::ValidationErrorsKind;

    errors.errors().values().find_map(|kind| match kind {
        ValidationErrorsKind::Field(errs) => errs
            .iter()
            .find_map(|e| e.message.as_ref().map(|m| m.to_string())),
        ValidationErrorsKind::Struct(inner) => first_validation_message(inner),
        ValidationErrorsKind::List(items) => items.values().find_map(|inner| first_validation_message(inner)),
    })
}

/// Result type alias for client and view-model operations
pub type ApiResult<T> = Result<T, AppError>;

/// Helper function to create a validation error
pub fn validation_error(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}

/// Helper function to create a forbidden error
pub fn forbidden_error(msg: impl Into<String>) -> AppError {
    AppError::Forbidden(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_from_body() {
        let err = AppError::from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"success":false,"message":"Table 'users' is locked"}"#,
            true,
        );
        assert_eq!(err.to_string(), "Table 'users' is locked");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_falls_back_to_status_text() {
        let err = AppError::from_response(StatusCode::NOT_FOUND, "<html>nope</html>", true);
        assert_eq!(err.to_string(), "Not Found");

        let err = AppError::from_response(StatusCode::BAD_REQUEST, r#"{"message":"  "}"#, true);
        assert_eq!(err.to_string(), "Bad Request");
    }

    #[test]
    fn test_falls_back_to_generic_message() {
        let status = StatusCode::from_u16(599).unwrap();
        let err = AppError::from_response(status, "", true);
        assert_eq!(err.to_string(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_auth_failures_are_distinct() {
        let err = AppError::from_response(StatusCode::UNAUTHORIZED, r#"{"message":"Token expired"}"#, true);
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Token expired");

        let err = AppError::from_response(StatusCode::FORBIDDEN, "", true);
        assert!(err.is_unauthorized());

        // Login failures are plain API errors.
        let err = AppError::from_response(StatusCode::UNAUTHORIZED, r#"{"message":"Invalid credentials."}"#, false);
        assert!(!err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
    }
}

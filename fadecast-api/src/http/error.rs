// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Convert fadecast_core errors to HTTP errors
impl From<fadecast_core::Error> for AppError {
    fn from(err: fadecast_core::Error) -> Self {
        use fadecast_core::Error;

        match err {
            Error::NotFound(msg) => Self::not_found(msg),
            Error::Validation(e) => Self::bad_request(e.to_string()),
            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

/// Convert serde_json errors to HTTP errors
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(format!("JSON error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fadecast_core::validation::ValidationError;

    #[test]
    fn test_core_error_mapping() {
        let not_found: AppError = fadecast_core::Error::NotFound("x".to_string()).into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let invalid: AppError = fadecast_core::Error::Validation(ValidationError::Multiple(
            "crossfade_value".to_string(),
        ))
        .into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert!(invalid.message.contains("crossfade_value"));

        let internal: AppError = fadecast_core::Error::Internal("secret detail".to_string()).into();
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.message.contains("secret"));
    }
}

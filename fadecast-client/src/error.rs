//! Client-side error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// 404 rendered by the fadecast server itself
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Error body rendered by the server
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

/// Map a failed response body to an error. Only a 404 carrying the server's
/// own error body means the resource is missing; any other 404 (wrong base
/// path, a proxy page) stays a plain status error.
pub(crate) fn error_from_body(status: u16, text: &str, reason: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) if status == 404 && body.status == 404 => ClientError::NotFound(body.error),
        Ok(body) => ClientError::Status {
            status,
            message: body.error,
        },
        Err(_) => ClientError::Status {
            status,
            message: reason.to_string(),
        },
    }
}

/// Turn a non-success response into a [`ClientError`], keeping the server's
/// message when the body carries one.
pub(crate) async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    Err(error_from_body(
        status.as_u16(),
        &text,
        status.canonical_reason().unwrap_or("unknown"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_404_is_not_found() {
        let err = error_from_body(404, r#"{"error":"Channel abc not found","status":404}"#, "Not Found");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Channel abc"));
    }

    #[test]
    fn test_foreign_404_is_a_status_error() {
        let err = error_from_body(404, "<html>404 page not found</html>", "Not Found");
        assert!(!err.is_not_found());
        assert!(matches!(err, ClientError::Status { status: 404, .. }));

        // JSON from something other than the server
        let err = error_from_body(404, r#"{"message":"no route"}"#, "Not Found");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_server_error_keeps_message() {
        let err = error_from_body(400, r#"{"error":"Invalid crossfade_value","status":400}"#, "Bad Request");
        assert!(matches!(err, ClientError::Status { status: 400, ref message } if message.contains("crossfade_value")));
    }
}

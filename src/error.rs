//! Error types for request handling

use hyper::StatusCode;
use thiserror::Error;

/// Errors that fail a single echo request.
///
/// None of these stop the server; each maps to a fixed status code.
#[derive(Debug, Error)]
pub enum EchoError {
    /// Request carried no Content-Length header
    #[error("Content-Length header is required")]
    MissingContentLength,

    /// Content-Length was present but not a non-negative integer
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Body could not be read in full
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// Body was not valid UTF-8
    #[error("Request body is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Record could not be rendered
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Journal append failed
    #[error("Failed to write echo log: {0}")]
    LogWrite(#[from] std::io::Error),
}

impl EchoError {
    /// HTTP status returned to the client for this error
    pub fn status(&self) -> StatusCode {
        match self {
            EchoError::MissingContentLength => StatusCode::LENGTH_REQUIRED,
            EchoError::InvalidContentLength(_)
            | EchoError::BodyRead(_)
            | EchoError::InvalidUtf8(_) => StatusCode::BAD_REQUEST,
            EchoError::Serialize(_) | EchoError::LogWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            EchoError::MissingContentLength.status(),
            StatusCode::LENGTH_REQUIRED
        );
        assert_eq!(
            EchoError::InvalidContentLength("abc".into()).status(),
            StatusCode::BAD_REQUEST
        );

        let utf8 = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        assert_eq!(EchoError::from(utf8).status(), StatusCode::BAD_REQUEST);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            EchoError::from(io).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            EchoError::InvalidContentLength("abc".into()).to_string(),
            "Invalid Content-Length: abc"
        );
    }
}

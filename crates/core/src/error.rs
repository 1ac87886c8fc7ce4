// Error types for generation and similarity requests

use thiserror::Error;

/// Result type alias for core service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors that can occur while serving a generation or similarity request
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Required request input is missing or empty
    #[error("{0}")]
    BadRequest(String),

    /// Upstream inference server answered with a non-success status
    #[error("API request failed with status code {status}")]
    Upstream { status: u16 },

    /// Embedding backend failed or returned unusable vectors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Anything else (transport failures, malformed chunks, ...)
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ServiceError::BadRequest(msg.into())
    }

    /// Create an upstream status error
    pub fn upstream(status: u16) -> Self {
        ServiceError::Upstream { status }
    }

    /// Create an embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        ServiceError::Embedding(msg.into())
    }

    /// Whether the caller sent an invalid request (as opposed to a server-side failure)
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::BadRequest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_includes_status() {
        let err = ServiceError::upstream(502);
        assert_eq!(err.to_string(), "API request failed with status code 502");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_bad_request_message_is_verbatim() {
        let err = ServiceError::bad_request("Missing prompt");
        assert_eq!(err.to_string(), "Missing prompt");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_internal_from_anyhow() {
        let err: ServiceError = anyhow::anyhow!("connection reset").into();
        assert_eq!(err.to_string(), "connection reset");
    }
}

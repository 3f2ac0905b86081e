//! Error types for the signaling relay

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Missing or malformed required parameters
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The referenced caller has no record
    #[error("caller {0} not found")]
    NotFound(String),
}

impl SessionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SessionError::InvalidRequest(message.into())
    }

    pub fn not_found(caller_id: impl Into<String>) -> Self {
        SessionError::NotFound(caller_id.into())
    }

    /// Wire code for this error
    pub fn code(&self) -> ErrorCode {
        ErrorCode::from(self)
    }

    /// HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        self.code().http_status()
    }
}

/// Wire error codes (sent in error bodies)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    NotFound,
}

impl From<&SessionError> for ErrorCode {
    fn from(e: &SessionError) -> Self {
        match e {
            SessionError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            SessionError::NotFound(_) => ErrorCode::NotFound,
        }
    }
}

impl ErrorCode {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::InvalidRequest => 400,
            ErrorCode::NotFound => 404,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(SessionError::invalid("missing callerType").http_status(), 400);
        assert_eq!(SessionError::not_found("42").http_status(), 404);
    }

    #[test]
    fn test_error_display() {
        let err = SessionError::not_found("1700000010000");
        assert_eq!(err.to_string(), "caller 1700000010000 not found");

        let err = SessionError::invalid("callerId is required");
        assert_eq!(err.to_string(), "invalid request: callerId is required");
    }

    #[test]
    fn test_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::NotFound).unwrap();
        assert_eq!(json, r#""not_found""#);
    }
}

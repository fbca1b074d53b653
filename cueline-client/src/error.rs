use cueline_core::Action;
use serde::Deserialize;
use thiserror::Error;

use crate::{StoreError, TransportError};

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The session could not be renewed, or there is none
    #[error("Session expired, please log in again")]
    AuthExpired,
    /// The server rejected the credential, for example because it was revoked
    #[error("Not authorized, please log in again")]
    Unauthorized,
    /// Username or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The server refused the operation for this user
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// The operation is not available in the current mode and role, nothing was sent
    #[error("Not permitted to {0}")]
    NotPermitted(Action),
    /// The server rejected the request for any other reason
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    /// Network errors, timeouts, and server errors. These usually go away by themselves.
    #[error("Temporarily unavailable: {0}")]
    Transient(String),
    /// A response or credential could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Credentials could not be persisted or loaded
    #[error("Session storage failed: {0}")]
    Storage(String),
}

/// The body the server sends along with error statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    errormessage: String,
}

impl ClientError {
    /// Returns true if the error ends the session, and the user has to log in again.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::AuthExpired | Self::Unauthorized)
    }

    /// Returns true if retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Maps an unsuccessful status code and its body to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.errormessage)
            .unwrap_or_else(|_| body.trim().to_string());

        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden(message),
            500..=u16::MAX => Self::Transient(message),
            status => Self::Rejected { status, message },
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(value: TransportError) -> Self {
        Self::Transient(value.to_string())
    }
}

impl From<StoreError> for ClientError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_status() {
        let body = r#"{"httpstatus": "500", "errormessage": "Error deleting song: not found", "requesturl": "/api/queue/x"}"#;

        assert_eq!(ClientError::from_status(401, ""), ClientError::Unauthorized);
        assert_eq!(
            ClientError::from_status(403, "no more skips"),
            ClientError::Forbidden("no more skips".to_string())
        );
        assert_eq!(
            ClientError::from_status(500, body),
            ClientError::Transient("Error deleting song: not found".to_string())
        );
        assert_eq!(
            ClientError::from_status(404, "gone\n"),
            ClientError::Rejected {
                status: 404,
                message: "gone".to_string()
            }
        );
    }

    #[test]
    fn test_session_fatal() {
        assert!(ClientError::AuthExpired.is_session_fatal());
        assert!(ClientError::Unauthorized.is_session_fatal());
        assert!(!ClientError::Forbidden(String::new()).is_session_fatal());
        assert!(!ClientError::InvalidCredentials.is_session_fatal());
        assert!(ClientError::Transient(String::new()).is_transient());
    }
}

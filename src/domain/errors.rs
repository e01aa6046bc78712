//! Domain error types
//!
//! Per-operation failures are returned as data, never thrown past the
//! adapter boundary.

use std::fmt;

use crate::supabase::{BackendError, ClientError};

/// A failure that did not come from the backend's own error channel:
/// transport faults, undecodable payloads, panics inside the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnexpectedError {
    message: String,
    panicked: bool,
}

impl UnexpectedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            panicked: false,
        }
    }

    /// The call panicked instead of returning.
    pub fn from_panic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            panicked: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_panic(&self) -> bool {
        self.panicked
    }
}

impl fmt::Display for UnexpectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UnexpectedError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// The backend reported the failure
    Backend(BackendError),
    /// Anything else
    Unexpected(UnexpectedError),
}

impl OperationError {
    pub fn message(&self) -> &str {
        match self {
            OperationError::Backend(e) => &e.message,
            OperationError::Unexpected(e) => e.message(),
        }
    }

    /// True for a backend "no rows" answer (404, or 406 on single-row reads).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            OperationError::Backend(BackendError {
                status: Some(404 | 406),
                ..
            })
        )
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationError::Backend(e) => write!(f, "Backend error: {}", e),
            OperationError::Unexpected(e) => write!(f, "Unexpected error: {}", e),
        }
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OperationError::Backend(e) => Some(e),
            OperationError::Unexpected(e) => Some(e),
        }
    }
}

impl From<ClientError> for OperationError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Api(e) => OperationError::Backend(e),
            other => OperationError::Unexpected(UnexpectedError::new(other.to_string())),
        }
    }
}

/// Outcome of one backend call: the payload or a normalized error, never both.
pub type OperationResult<T> = Result<T, OperationError>;

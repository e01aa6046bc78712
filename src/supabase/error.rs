//! Errors raised by the backend clients.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::infrastructure::config::ConfigError;

/// Error reported by the backend through its own error channel.
///
/// Auth, table and storage services each use a different body shape; they
/// are all folded into this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
            hint: None,
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Build from a non-success response body.
    ///
    /// Understands `{message, code, details, hint}` (tables),
    /// `{error, error_description}` / `{msg, error_code}` (auth) and
    /// `{statusCode, error, message}` (storage).
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Raw {
            message: Option<String>,
            msg: Option<String>,
            error_description: Option<String>,
            error: Option<String>,
            code: Option<serde_json::Value>,
            error_code: Option<String>,
            details: Option<String>,
            hint: Option<String>,
        }

        let raw: Option<Raw> = serde_json::from_str(body).ok();
        let Some(raw) = raw else {
            let message = if body.trim().is_empty() {
                format!("Request failed with status {}", status)
            } else {
                body.trim().to_string()
            };
            return Self::new(message).with_status(status);
        };

        let message = raw
            .message
            .or(raw.msg)
            .or(raw.error_description)
            .or_else(|| raw.error.clone())
            .unwrap_or_else(|| format!("Request failed with status {}", status));

        let code = raw
            .code
            .map(|c| match c {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .or(raw.error_code)
            .or(raw.error);

        Self {
            message,
            code,
            details: raw.details,
            hint: raw.hint,
            status: Some(status),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BackendError {}

/// Failure of a single client call.
///
/// Only `Api` originates from the backend's own error channel; the other
/// variants are failures the caller did not get an answer for.
#[derive(Debug)]
pub enum ClientError {
    /// The backend answered with an error payload
    Api(BackendError),
    /// The request never completed (connect, TLS, body read)
    Transport(reqwest::Error),
    /// The backend answered but the payload could not be decoded
    Decode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Api(e) => write!(f, "{}", e),
            ClientError::Transport(e) => write!(f, "Transport error: {}", e),
            ClientError::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Api(e) => Some(e),
            ClientError::Transport(e) => Some(e),
            ClientError::Decode(_) => None,
        }
    }
}

impl From<BackendError> for ClientError {
    fn from(e: BackendError) -> Self {
        ClientError::Api(e)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e)
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

/// A client could not be built.
#[derive(Debug)]
pub enum ConstructionError {
    /// The public configuration failed validation
    Config(ConfigError),
    /// An admin client was requested without `SUPABASE_SERVICE_ROLE_KEY`
    MissingServiceRoleKey,
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionError::Config(e) => write!(f, "{}", e),
            ConstructionError::MissingServiceRoleKey => write!(
                f,
                "SUPABASE_SERVICE_ROLE_KEY is required for admin operations. \
                 This should only be used in server-side code."
            ),
        }
    }
}

impl std::error::Error for ConstructionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConstructionError::Config(e) => Some(e),
            ConstructionError::MissingServiceRoleKey => None,
        }
    }
}

impl From<ConfigError> for ConstructionError {
    fn from(e: ConfigError) -> Self {
        ConstructionError::Config(e)
    }
}

//! Errors returned by project clients

use thiserror::Error;

/// Failure of a single API call
///
/// The HTTP status is preserved whenever the backend produced one so callers
/// can tell a rejected payload (413) from a transport failure.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("GraphQL error: {message}")]
    GraphQl {
        message: String,
        status: Option<u16>,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// HTTP status code carried by this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::GraphQl { status, .. } => *status,
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// Human readable message without the status prefix
    pub fn message(&self) -> String {
        match self {
            Self::Http { message, .. } | Self::GraphQl { message, .. } => message.clone(),
            Self::Transport(m) | Self::Decode(m) | Self::Protocol(m) | Self::NotFound(m) => {
                m.clone()
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None if err.is_decode() => Self::Decode(err.to_string()),
            None => Self::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

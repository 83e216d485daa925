//! Error types for the client core.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failures surfaced by the remote collaborator and the layers above it.
///
/// None of these are ever stored in the cache.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Backend unreachable or the request timed out.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Backend answered with a non-2xx status or an explicit error payload.
    #[error("remote rejected request{}: {reason}", status_suffix(.status))]
    RemoteRejected { status: Option<u16>, reason: String },

    /// Backend answered but the payload does not have the expected shape.
    #[error("malformed {what} payload: {reason}")]
    Decode { what: String, reason: String },

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl ClientError {
    pub fn rejected(status: Option<u16>, reason: impl Into<String>) -> Self {
        ClientError::RemoteRejected {
            status,
            reason: reason.into(),
        }
    }

    pub fn decode(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ClientError::Decode {
            what: what.into(),
            reason: err.to_string(),
        }
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::NetworkFailure(_) => true,
            ClientError::RemoteRejected { status, .. } => status.is_some_and(|s| s >= 500),
            ClientError::Decode { .. } | ClientError::Config(_) => false,
        }
    }
}

//! Errors raised at the translation backend boundary.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// No shared secret is configured; the backend would reject every call.
    #[error("backend shared secret is not configured")]
    MissingSecret,

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("cannot reach {endpoint}: {message}")]
    Unreachable { endpoint: String, message: String },

    /// The backend refused the shared secret.
    #[error("{endpoint} rejected the shared secret (status {status})")]
    Unauthorized { endpoint: String, status: u16 },

    #[error("{endpoint} answered with status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("invalid response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("batch response has {actual} translations for {expected} inputs")]
    LengthMismatch { expected: usize, actual: usize },

    /// Every endpoint candidate failed; `last` is the final failure.
    #[error("all {attempts} backend endpoints failed, last error: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<BackendError>,
    },
}

impl BackendError {
    /// Whether the (final) failure was the backend rejecting our credentials.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::MissingSecret | Self::Unauthorized { .. } => true,
            Self::Exhausted { last, .. } => last.is_auth(),
            _ => false,
        }
    }
}

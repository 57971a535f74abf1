//! Error types for marknote-core

use thiserror::Error;

/// Result type alias using marknote-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in marknote-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure (connect, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx answer from the notes backend
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Note (or remote resource) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// AI provider error
    #[error("AI error: {0}")]
    Ai(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Transport-level failure, meaning the backend was never reached.
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else if let Some(status) = error.status() {
            Self::Server {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            Self::Network(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        assert!(Error::Network("timeout".into()).is_network());
        assert!(!Error::NotFound("a".into()).is_network());
        assert!(Error::NotFound("a".into()).is_not_found());
        assert!(!Error::Server {
            status: 500,
            message: "boom".into()
        }
        .is_not_found());
    }

    #[test]
    fn server_error_message_includes_status() {
        let error = Error::Server {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(error.to_string(), "Server error (502): bad gateway");
    }
}

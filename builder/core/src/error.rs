//! Error Types
//!
//! - [`TransportError`]: the generation request failed (chat-visible)
//! - [`BuilderError`]: a builder action was refused
//! - [`StorageError`]: version persistence failed (logged only)

use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single generation request
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request never reached the endpoint
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status
    #[error("{message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message derived from the response body
        message: String,
    },

    /// Successful status but no body to read
    #[error("No response body received")]
    MissingBody,

    /// Reading the streamed body failed
    #[error("Stream read error: {0}")]
    Read(String),
}

/// Builder actions that were refused or could not start
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BuilderError {
    /// A generation is already in flight
    #[error("A generation is already in progress")]
    Busy,

    /// Nothing to send
    #[error("Message is empty")]
    EmptyMessage,

    /// The selected model key is not in the registry
    #[error("Model '{0}' is not available")]
    ModelUnavailable(String),

    /// A refinement was requested with no HTML to refine
    #[error("There is no generated HTML to refine")]
    NothingToRefine,

    /// The requested version does not exist
    #[error("Version '{0}' not found")]
    VersionNotFound(String),
}

/// Version persistence failures
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("Storage I/O failed at {path}: {source}")]
    Io {
        /// File that was accessed
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Stored data is not a valid version list
    #[error("Stored versions are corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_displays_message_only() {
        let err = TransportError::Status {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn test_builder_error_messages() {
        assert_eq!(
            BuilderError::ModelUnavailable("x".into()).to_string(),
            "Model 'x' is not available"
        );
        assert_eq!(
            BuilderError::Busy.to_string(),
            "A generation is already in progress"
        );
    }
}

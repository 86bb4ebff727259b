//! Error types for profile-harvester
//!
//! Two layers:
//! - [`Error`] covers startup and persistence failures (configuration, input
//!   file, I/O, run lock). These abort a run before any item is processed.
//! - [`FetchError`] covers a single profile fetch. These never abort a run;
//!   the orchestrator logs them and moves on to the next item.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for profile-harvester operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for profile-harvester
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "input_file")
        key: Option<String>,
    },

    /// The work (input) file is missing or unreadable
    #[error("input file {path}: {message}")]
    InputFile {
        /// Path of the work file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Another process holds the run lock for this configuration
    #[error("another run is already active (lock held at {lock_path})")]
    AlreadyRunning {
        /// Path of the lock file
        lock_path: PathBuf,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A fetch error surfaced outside the per-item loop (e.g. probing)
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a configuration key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, used by the binary for structured logging
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InputFile { .. } => "input_file_error",
            Error::AlreadyRunning { .. } => "already_running",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Fetch(e) => e.error_code(),
        }
    }
}

/// Outcome of a failed profile fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// The identity does not exist or is not accessible
    #[error("profile {identity} not found")]
    NotFound {
        /// The identity that was requested
        identity: String,
    },

    /// The upstream did not answer within the watchdog deadline
    #[error("no response within {after:?}")]
    TimedOut {
        /// The deadline that elapsed
        after: Duration,
    },

    /// The upstream answered with a non-success status
    #[error("upstream returned HTTP {status}")]
    Http {
        /// HTTP status code
        status: u16,
    },

    /// Connectivity failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The upstream answered but the body could not be decoded
    #[error("malformed profile payload: {0}")]
    Decode(String),

    /// The fetch was cancelled before it finished
    #[error("fetch cancelled")]
    Cancelled,

    /// Anything else reported by a fetcher implementation
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// True when the identity itself is missing (a skip, not a failure)
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            FetchError::NotFound { .. } => "not_found",
            FetchError::TimedOut { .. } => "timeout",
            FetchError::Http { .. } => "http_error",
            FetchError::Network(_) => "network_error",
            FetchError::Decode(_) => "decode_error",
            FetchError::Cancelled => "cancelled",
            FetchError::Other(_) => "fetch_error",
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_helper_records_the_offending_key() {
        let err = Error::config("must not be empty", "input_file");
        match &err {
            Error::Config { message, key } => {
                assert_eq!(message, "must not be empty");
                assert_eq!(key.as_deref(), Some("input_file"));
            }
            other => panic!("expected Config, got {other:?}"),
        }
        assert_eq!(err.to_string(), "configuration error: must not be empty");
        assert_eq!(err.error_code(), "config_error");
    }

    #[test]
    fn only_not_found_is_a_skip() {
        let not_found = FetchError::NotFound {
            identity: "ghost".into(),
        };
        assert!(not_found.is_not_found());

        let others = [
            FetchError::TimedOut {
                after: Duration::from_secs(10),
            },
            FetchError::Http { status: 500 },
            FetchError::Decode("eof".into()),
            FetchError::Cancelled,
            FetchError::Other("boom".into()),
        ];
        for err in others {
            assert!(!err.is_not_found(), "{err:?} must count as a failure");
        }
    }

    #[test]
    fn fetch_errors_keep_their_code_when_wrapped() {
        let err: Error = FetchError::Http { status: 429 }.into();
        assert_eq!(err.error_code(), "http_error");
        assert_eq!(err.to_string(), "fetch error: upstream returned HTTP 429");
    }

    #[test]
    fn already_running_names_the_lock_file() {
        let err = Error::AlreadyRunning {
            lock_path: PathBuf::from("/tmp/config.lock"),
        };
        assert!(err.to_string().contains("/tmp/config.lock"));
        assert_eq!(err.error_code(), "already_running");
    }
}

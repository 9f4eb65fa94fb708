//! Error types for isbn-enrich
//!
//! Errors fall into two groups:
//! - [`Error`] - run-level failures. `Config` and `DataIntegrity` are fatal,
//!   everything else is surfaced per batch and logged by the orchestrator.
//! - [`FetchError`] - per-batch lookup failures. These never escape the
//!   fetcher; they are carried inside [`FetchOutcome`](crate::lookup::FetchOutcome)
//!   and degrade the batch to zero records.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for isbn-enrich operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for isbn-enrich
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration, detected before any I/O happens
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "batching.batch_size")
        key: Option<String>,
    },

    /// Checkpoint or output artifact could not be written
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A checkpoint artifact does not match the record schema
    #[error("data integrity error in {artifact}: {reason}")]
    DataIntegrity {
        /// The artifact that failed to load
        artifact: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// The identifier source dataset could not be read
    #[error("source error in {path}: {reason}")]
    Source {
        /// Path to the source dataset
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Returns true if this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config { .. } | Error::DataIntegrity { .. })
    }
}

/// Artifact storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to create the directory holding an artifact
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to encode records as CSV
    #[error("failed to encode {path}: {reason}")]
    Encode {
        /// Artifact being encoded
        path: PathBuf,
        /// Encoder error message
        reason: String,
    },

    /// Failed to write or publish an artifact
    #[error("failed to write {path}: {source}")]
    Write {
        /// Artifact that could not be written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single remote lookup
///
/// Every variant carries the rendered query so log lines identify the batch
/// without the API key ever being part of the message.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS or body transfer failure
    #[error("transport failure for {query}: {detail}")]
    Transport {
        /// Query URL (without credentials)
        query: String,
        /// Transport error message
        detail: String,
    },

    /// Remote API answered with a non-success status
    #[error("remote API returned {status} for {query}")]
    RemoteApi {
        /// Query URL (without credentials)
        query: String,
        /// HTTP status code
        status: u16,
    },

    /// No response within the configured request timeout
    #[error("request for {query} timed out after {after:?}")]
    Timeout {
        /// Query URL (without credentials)
        query: String,
        /// The timeout that elapsed
        after: Duration,
    },

    /// Response body did not match the expected volume list shape
    #[error("unexpected response body for {query}: {detail}")]
    Parse {
        /// Query URL (without credentials)
        query: String,
        /// Decoder error message
        detail: String,
    },
}

impl FetchError {
    /// The query this failure belongs to
    pub fn query(&self) -> &str {
        match self {
            FetchError::Transport { query, .. }
            | FetchError::RemoteApi { query, .. }
            | FetchError::Timeout { query, .. }
            | FetchError::Parse { query, .. } => query,
        }
    }

    /// HTTP status, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::RemoteApi { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true when the failure points at a change in the remote API
    /// contract rather than a transient transport problem
    pub fn is_contract_drift(&self) -> bool {
        matches!(self, FetchError::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_helper_sets_key() {
        let err = Error::config("batching.batch_size", "must be at least 1");
        match &err {
            Error::Config { message, key } => {
                assert_eq!(message, "must be at least 1");
                assert_eq!(key.as_deref(), Some("batching.batch_size"));
            }
            other => panic!("expected Config, got {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "configuration error: must be at least 1",
            "display should include the message"
        );
    }

    #[test]
    fn fatal_classification() {
        assert!(Error::config("api.base_url", "bad").is_fatal());
        assert!(
            Error::DataIntegrity {
                artifact: PathBuf::from("_part0001.csv"),
                reason: "header mismatch".into(),
            }
            .is_fatal()
        );
        assert!(
            !Error::Storage(StorageError::Write {
                path: PathBuf::from("_part0001.csv"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
            .is_fatal(),
            "storage failures only affect one batch"
        );
    }

    #[test]
    fn data_integrity_message_names_artifact() {
        let err = Error::DataIntegrity {
            artifact: PathBuf::from("/tmp/ckpt/_part0003.csv"),
            reason: "unexpected header".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("_part0003.csv"), "got: {msg}");
        assert!(msg.contains("unexpected header"), "got: {msg}");
    }

    #[test]
    fn fetch_error_accessors() {
        let api = FetchError::RemoteApi {
            query: "https://example.test/volumes?q=isbn%3A1".into(),
            status: 429,
        };
        assert_eq!(api.status(), Some(429));
        assert_eq!(api.query(), "https://example.test/volumes?q=isbn%3A1");
        assert!(!api.is_contract_drift());

        let parse = FetchError::Parse {
            query: "q".into(),
            detail: "expected object".into(),
        };
        assert_eq!(parse.status(), None);
        assert!(parse.is_contract_drift());

        let timeout = FetchError::Timeout {
            query: "q".into(),
            after: Duration::from_secs(5),
        };
        assert!(timeout.to_string().contains("timed out"));
        assert!(!timeout.is_contract_drift());
    }
}

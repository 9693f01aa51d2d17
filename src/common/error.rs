//! Error types for the probe runner
//!
//! Probe-level failures (unreachable service, unexpected status, malformed
//! payload) are represented here too, but they never escape a probe: the
//! probe turns them into a failed result. Everything else propagates to
//! `main` and ends the process with a message.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the probe runner
#[derive(Error, Debug)]
pub enum Error {
    // === Transport Errors ===
    #[error("request to {url} timed out after {secs} seconds")]
    Timeout { url: String, secs: u64 },

    #[error("could not connect to {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),

    // === Probe Errors ===
    #[error("status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    // === Orchestrator Errors ===
    #[error("A run is already in progress")]
    RunInProgress,

    #[error("{0}")]
    RunFailed(String),

    // === Pipeline Errors ===
    #[error("Invalid pipeline: {0}")]
    Pipeline(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a timeout error for a request
    pub fn timeout(url: &str, secs: u64) -> Self {
        Self::Timeout {
            url: url.to_string(),
            secs,
        }
    }

    /// Create an unreachable service error
    pub fn unreachable(url: &str, reason: impl ToString) -> Self {
        Self::Unreachable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an unexpected status error, keeping the response body for diagnostics
    pub fn unexpected_status(status: u16, body: &str) -> Self {
        Self::UnexpectedStatus {
            status,
            body: body.to_string(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: impl ToString) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Whether this error happened at the transport boundary
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::Unreachable { .. } | Error::Http(_)
        )
    }
}

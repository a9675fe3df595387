//! Error types for the deployment workflow
//!
//! Every step of the workflow reports failure through [`DeployError`]. Failures
//! are split into transient ones (timeouts, transport errors, overloaded
//! indexer) which the retry policy may repeat, and permanent ones which abort
//! the run immediately.

use std::path::PathBuf;
use std::time::Duration;

/// Convenience Result type alias using the local error type
pub type Result<T> = std::result::Result<T, DeployError>;

#[derive(thiserror::Error, Debug)]
pub enum DeployError {
    // Config errors
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // Wallet errors
    #[error("Failed to read wallet address from {path}: {source}")]
    AddressFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Wallet address file is empty: {0}")]
    EmptyAddress(PathBuf),

    #[error("Indexer request failed with status {status}: {body}")]
    IndexerStatus { status: u16, body: String },

    #[error("Indexer returned no information for address {0}")]
    WalletNotIndexed(String),

    #[error("Invalid balance value: {0}")]
    InvalidBalance(String),

    // Artifact errors
    #[error("Failed to read validator artifact {path}: {source}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Validator artifact {0} contains no validators")]
    NoValidators(PathBuf),

    #[error("No validator titled '{0}' in artifact")]
    ValidatorNotFound(String),

    #[error("Invalid compiled code: {0}")]
    InvalidCompiledCode(String),

    // External process errors
    #[error("Failed to run {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{0} produced no output")]
    EmptyCommandOutput(String),

    // Transport errors
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: usize,
        last_error: Box<DeployError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeployError {
    /// Whether repeating the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DeployError::Timeout { .. } => true,
            DeployError::IndexerStatus { status, .. } => *status == 429 || *status >= 500,
            DeployError::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.is_request()
                    || err
                        .status()
                        .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
            }
            _ => false,
        }
    }
}

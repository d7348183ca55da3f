//! Error types for the reader network pipeline

use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Error taxonomy shared by every pipeline stage.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// A graph violates a structural precondition (e.g. projecting a non-bipartite graph).
    #[error("Structural precondition failed: {0}")]
    Structural(String),

    /// Invalid configuration value (unknown projection method, level out of range, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisting this artifact would replace a larger one from an earlier run.
    #[error("Checkpoint consistency failure: {0}")]
    Checkpoint(String),

    /// A single reader record or book interaction could not be used.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary artifact encoding or decoding error.
    #[error("Binary serialization error: {0}")]
    Binary(#[from] bincode::Error),

    /// Parquet input error.
    #[error("Parquet error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

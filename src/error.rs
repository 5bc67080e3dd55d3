//! Error types for the pastesift payload discovery engine.
//!
//! This module provides structured error handling using thiserror. Per-item
//! failures (a transform that did not apply, a reputation miss, a file that
//! vanished mid-batch) are handled locally by the components and never
//! surface here; these variants cover failures that abort a unit of work.

use thiserror::Error;

/// Main error type for pastesift operations.
#[derive(Debug, Error)]
pub enum SiftError {
    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Paste record parsing errors
    #[error("Invalid paste record: {0}")]
    InvalidRecord(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Zip archive read/write errors
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Outbound HTTP errors
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Worker pool setup or coordination errors
    #[error("Worker pool error: {0}")]
    Pool(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for pastesift operations
pub type Result<T> = std::result::Result<T, SiftError>;

//! Error types for the library engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] beat_core::BeatError),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Songs folder not found: {0}")]
    SongsNotFound(String),

    #[error("A scan is already in progress")]
    ScanInProgress,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

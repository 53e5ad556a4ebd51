/// Metadata-specific errors
use thiserror::Error;

/// Result type alias using `MetadataError`
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Metadata error types
#[derive(Error, Debug)]
pub enum MetadataError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Tag parsing error
    #[error("Tag parsing error: {0}")]
    ParseError(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Lofty error
    #[error(transparent)]
    Lofty(#[from] lofty::error::LoftyError),
}

impl From<MetadataError> for beat_core::BeatError {
    fn from(err: MetadataError) -> Self {
        match err {
            // Keep the io::Error intact so transient codes survive the
            // conversion and stay retryable upstream.
            MetadataError::Io(io_err) => beat_core::BeatError::Io(io_err),
            other => beat_core::BeatError::metadata(other.to_string()),
        }
    }
}

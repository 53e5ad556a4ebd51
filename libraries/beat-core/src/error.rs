/// Core error types for Beat Player
use thiserror::Error;

/// Result type alias using `BeatError`
pub type Result<T> = std::result::Result<T, BeatError>;

/// Core error type for Beat Player
#[derive(Error, Debug)]
pub enum BeatError {
    /// Metadata extraction errors
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Cache-related errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl BeatError {
    /// Create a metadata error
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    /// Create a cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether this error wraps a transient OS-level I/O condition
    /// (busy, resource temporarily unavailable, too many open files).
    ///
    /// Transient errors are worth retrying with backoff; everything else
    /// is terminal for the item it occurred on.
    pub fn is_transient(&self) -> bool {
        // EAGAIN, EBUSY, EMFILE
        const TRANSIENT_OS_CODES: &[i32] = &[11, 16, 24];

        match self {
            Self::Io(err) => {
                matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
                ) || err
                    .raw_os_error()
                    .is_some_and(|code| TRANSIENT_OS_CODES.contains(&code))
            }
            _ => false,
        }
    }
}

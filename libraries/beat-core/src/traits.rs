/// Core traits for Beat Player
use crate::error::Result;
use crate::types::ExtractedTags;
use std::path::Path;

/// Metadata reader trait
///
/// Implementers extract tag and stream metadata from audio files. The
/// scanning engine only ever talks to audio files through this seam, which
/// keeps tag-library choice and test instrumentation out of the engine.
pub trait MetadataReader: Send + Sync {
    /// Read metadata from an audio file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    fn read(&self, path: &Path) -> Result<ExtractedTags>;
}

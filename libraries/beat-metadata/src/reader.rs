/// Metadata reader implementation using lofty
use crate::error::MetadataError;
use beat_core::{ExtractedTags, MetadataReader};
use lofty::{Accessor, AudioFile, Probe, TaggedFileExt};
use std::io::BufReader;
use std::path::Path;

/// Metadata reader using the lofty library
pub struct LoftyTagReader;

impl LoftyTagReader {
    /// Create a new metadata reader
    pub fn new() -> Self {
        Self
    }

    fn read_tags(path: &Path) -> Result<ExtractedTags, MetadataError> {
        // Open through std first so transient OS errors (EBUSY, EMFILE)
        // surface as io::Error and stay retryable upstream.
        let file = std::fs::File::open(path)?;
        let tagged_file = Probe::new(BufReader::new(file))
            .guess_file_type()
            .map_err(|e| MetadataError::ParseError(format!("Failed to probe file: {}", e)))?
            .read()
            .map_err(|e| MetadataError::ParseError(format!("Failed to read file: {}", e)))?;

        let properties = tagged_file.properties();
        let mut tags = ExtractedTags {
            duration_seconds: properties.duration().as_secs_f64(),
            bitrate: properties.audio_bitrate(),
            sample_rate: properties.sample_rate(),
            ..Default::default()
        };

        // Prefer the primary tag (ID3v2 for MP3, Vorbis for OGG/FLAC)
        if let Some(tag) = tagged_file.primary_tag().or(tagged_file.first_tag()) {
            tags.title = tag.title().map(|s| s.to_string());
            tags.artist = tag.artist().map(|s| s.to_string());
            tags.album = tag.album().map(|s| s.to_string());
            tags.year = tag.year();

            // Genre fields often pack several genres into one delimited string
            tags.genres = tag
                .genre()
                .map(|g| {
                    g.split(&[',', ';', '/'][..])
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();
        }

        // Fallback: use the filename as title if the tags carry none
        if tags.title.is_none() {
            tags.title = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string());
        }

        Ok(tags)
    }
}

impl Default for LoftyTagReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataReader for LoftyTagReader {
    fn read(&self, path: &Path) -> beat_core::Result<ExtractedTags> {
        Self::read_tags(path).map_err(Into::into)
    }
}

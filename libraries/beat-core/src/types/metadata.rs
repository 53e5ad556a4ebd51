/// Track metadata types
use serde::{Deserialize, Serialize};

/// Raw metadata extracted from an audio file's tags and stream properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedTags {
    /// Track title
    pub title: Option<String>,

    /// Artist name
    pub artist: Option<String>,

    /// Album title
    pub album: Option<String>,

    /// Release year
    pub year: Option<u32>,

    /// Genres (tags often pack several into one delimited field)
    pub genres: Vec<String>,

    /// Duration in seconds
    pub duration_seconds: f64,

    /// Bitrate in kbps
    pub bitrate: Option<u32>,

    /// Sample rate in Hz
    pub sample_rate: Option<u32>,
}

/// Cached metadata for a single audio file
///
/// Identity is the absolute file path (the cache key). `content_hash` is
/// derived from the file's path, modification time, size, and inode, so it
/// changes iff the underlying file plausibly changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Duration in seconds
    pub duration_seconds: f64,

    /// Artist name
    pub artist: String,

    /// Track title
    pub title: String,

    /// Album title
    pub album: Option<String>,

    /// Release year
    pub year: Option<u32>,

    /// Genres
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,

    /// Bitrate in kbps
    pub bitrate: Option<u32>,

    /// Sample rate in Hz
    pub sample_rate: Option<u32>,

    /// Modification time (seconds since epoch) of the source file at
    /// extraction time
    pub source_mtime: i64,

    /// Size in bytes of the source file at extraction time
    pub source_size: u64,

    /// Stat-derived fingerprint of the source file
    pub content_hash: String,
}

impl TrackMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill this record from freshly extracted tags, reusing existing
    /// string allocations where possible.
    pub fn apply_tags(&mut self, tags: &ExtractedTags) {
        self.duration_seconds = tags.duration_seconds;
        self.artist.clear();
        if let Some(artist) = &tags.artist {
            self.artist.push_str(artist);
        }
        self.title.clear();
        if let Some(title) = &tags.title {
            self.title.push_str(title);
        }
        self.album = tags.album.clone();
        self.year = tags.year;
        self.genres.clear();
        self.genres.extend(tags.genres.iter().cloned());
        self.bitrate = tags.bitrate;
        self.sample_rate = tags.sample_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_tags_overwrites_previous_contents() {
        let mut meta = TrackMetadata {
            artist: "Old Artist".to_string(),
            title: "Old Title".to_string(),
            genres: vec!["Old Genre".to_string()],
            ..Default::default()
        };

        let tags = ExtractedTags {
            title: Some("New Title".to_string()),
            artist: None,
            duration_seconds: 180.0,
            genres: vec!["Electronic".to_string(), "Dance".to_string()],
            ..Default::default()
        };

        meta.apply_tags(&tags);
        assert_eq!(meta.title, "New Title");
        assert!(meta.artist.is_empty());
        assert_eq!(meta.duration_seconds, 180.0);
        assert_eq!(meta.genres, vec!["Electronic", "Dance"]);
    }

    #[test]
    fn metadata_json_round_trip() {
        let meta = TrackMetadata {
            duration_seconds: 245.5,
            artist: "Artist".to_string(),
            title: "Title".to_string(),
            album: Some("Album".to_string()),
            year: Some(2019),
            genres: vec!["Rock".to_string()],
            bitrate: Some(320),
            sample_rate: Some(44100),
            source_mtime: 1_700_000_000,
            source_size: 4_194_304,
            content_hash: "abc123".to_string(),
        };

        let json = serde_json::to_string(&meta).unwrap();
        let back: TrackMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
    }
}

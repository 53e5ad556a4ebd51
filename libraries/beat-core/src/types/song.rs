/// Song domain type
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One playable song derived from a beatmap folder
///
/// Produced once per folder after best-file selection, metadata extraction,
/// and deduplication; ownership transfers to the caller when a scan
/// completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    /// Display name (the folder name with any leading beatmapset id removed)
    pub name: String,

    /// Absolute path to the selected audio file
    pub audio_path: PathBuf,

    /// Beatmapset id parsed from the folder name, if present
    pub beatmapset_id: Option<String>,

    /// Background image for the song, if any
    pub image_path: Option<PathBuf>,

    /// Video asset for the song, if any
    pub video_path: Option<PathBuf>,

    /// Artist name
    pub artist: String,

    /// Track title
    pub title: String,

    /// Duration in seconds
    pub duration_seconds: f64,

    /// Bitrate in kbps
    pub bitrate: Option<u32>,

    /// Size of the audio file in bytes
    pub file_size: Option<u64>,

    /// How many audio files the folder contained before selection
    pub audio_file_count: usize,
}

impl SongRecord {
    /// Create a new song record with minimal fields
    pub fn new(name: impl Into<String>, audio_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            audio_path,
            ..Default::default()
        }
    }
}

/// Format a duration in seconds as `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let minutes = total / 60;
    let secs = total % 60;
    format!("{}:{:02}", minutes, secs)
}

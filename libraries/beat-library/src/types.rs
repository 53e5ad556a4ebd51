//! Scan-scoped types for the library engine

use beat_core::SongRecord;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// One subdirectory of the library root representing a single music set
/// with its audio/image/video assets. Created per scan, discarded after.
#[derive(Debug, Clone)]
pub struct FolderCandidate {
    /// Folder name (the candidate's identity within one scan)
    pub folder_id: String,

    /// Beatmapset id parsed from the folder name, if present
    pub beatmapset_id: Option<String>,

    /// Folder name with the leading beatmapset id removed
    pub display_name: String,

    /// Absolute path to the folder
    pub folder_path: PathBuf,

    /// Audio file names found in the folder
    pub audio_files: Vec<String>,

    /// Image file names found in the folder
    pub image_files: Vec<String>,

    /// Video file names found in the folder
    pub video_files: Vec<String>,
}

/// The audio file chosen from a folder to represent its track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestFile {
    /// File name within the folder
    pub file_name: String,

    /// Size in bytes (0 when the probe failed)
    pub size: u64,

    /// Duration in seconds (0 when not probed or the probe failed)
    pub duration_seconds: f64,
}

/// Result of a scan, returned to the caller instead of an error
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    /// Whether the scan completed
    pub success: bool,

    /// Human-readable status message
    pub message: String,

    /// Published songs (empty on failure)
    pub songs: Vec<SongRecord>,
}

impl ScanOutcome {
    /// Build a failed outcome with no songs
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            songs: Vec::new(),
        }
    }
}

/// Progress event emitted after each processed sub-batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanProgress {
    /// Items settled so far (success or failure)
    pub processed: usize,

    /// Total items submitted to the batch processor
    pub total: usize,

    /// Completion percentage (0-100)
    pub percentage: f64,
}

/// Counters for one scan; exists only for the scan's duration
#[derive(Debug, Clone)]
pub struct ScanStats {
    /// Candidates submitted to the batch processor
    pub total_candidates: usize,

    /// Items settled (success or failure)
    pub processed: usize,

    /// Items satisfied from cache rather than fresh extraction
    pub cache_hits: usize,

    /// Items that failed terminally
    pub errors: usize,

    /// When the scan started
    pub started_at: Instant,
}

impl ScanStats {
    /// Create stats for a scan over `total_candidates` items
    pub fn new(total_candidates: usize) -> Self {
        Self {
            total_candidates,
            processed: 0,
            cache_hits: 0,
            errors: 0,
            started_at: Instant::now(),
        }
    }

    /// Cache hit rate as a percentage, capped at 100
    pub fn hit_rate(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        let rate = (self.cache_hits as f64 / self.processed as f64) * 100.0;
        rate.min(100.0)
    }
}

/// Cache statistics queried on demand
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Entries currently cached
    pub size: usize,

    /// Configured entry ceiling
    pub max_size: usize,

    /// Lifetime hit rate as a percentage (0-100)
    pub hit_rate: f64,

    /// Approximate in-memory footprint, human readable
    pub memory_usage: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_caps_at_one_hundred() {
        let mut stats = ScanStats::new(10);
        stats.processed = 4;
        stats.cache_hits = 4;
        assert_eq!(stats.hit_rate(), 100.0);

        stats.cache_hits = 6;
        assert_eq!(stats.hit_rate(), 100.0);

        stats.processed = 0;
        assert_eq!(stats.hit_rate(), 0.0);
    }
}

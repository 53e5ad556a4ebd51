//! Per-folder best-file selection
//!
//! Beatmap folders commonly ship a short preview clip alongside the full
//! track. Size and duration dominate the score so the full track wins even
//! without metadata; the preview penalty breaks the rare ties.

use crate::cache::MetadataCache;
use crate::fs::StatCache;
use crate::types::BestFile;
use beat_core::MetadataReader;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Score bonus for files that are not previews
const NON_PREVIEW_BONUS: f64 = 15.0;

/// Score bonus for mp3 files
const MP3_BONUS: f64 = 5.0;

/// Score multiplier applied to preview files
const PREVIEW_PENALTY: f64 = 0.3;

/// Picks the canonical audio track among a folder's candidates
#[derive(Clone)]
pub struct BestFileSelector {
    cache: Arc<MetadataCache>,
    reader: Arc<dyn MetadataReader>,
    stat_cache: Arc<StatCache>,
}

impl BestFileSelector {
    /// Create a selector probing through the given cache and reader
    pub fn new(cache: Arc<MetadataCache>, reader: Arc<dyn MetadataReader>) -> Self {
        let stat_cache = cache.stat_cache();
        Self {
            cache,
            reader,
            stat_cache,
        }
    }

    /// Select the best audio file in `folder` among `audio_files`
    ///
    /// Returns `None` for zero candidates or when no candidate has nonzero
    /// size. A single candidate is trusted as-is, with size and duration
    /// probed opportunistically.
    pub async fn select_best(&self, folder: &Path, audio_files: &[String]) -> Option<BestFile> {
        match audio_files {
            [] => None,
            [only] => Some(self.probe_single(folder, only).await),
            _ => self.score_candidates(folder, audio_files).await,
        }
    }

    async fn probe_single(&self, folder: &Path, file_name: &str) -> BestFile {
        let path = folder.join(file_name);
        let size = self
            .stat_cache
            .stat(&path)
            .await
            .map(|stat| stat.size)
            .unwrap_or(0);
        let duration_seconds = self.probe_duration(&path).await;
        BestFile {
            file_name: file_name.to_string(),
            size,
            duration_seconds,
        }
    }

    async fn score_candidates(&self, folder: &Path, audio_files: &[String]) -> Option<BestFile> {
        let mut best: Option<BestFile> = None;
        let mut best_score = f64::NEG_INFINITY;

        for file_name in audio_files {
            let path = folder.join(file_name);
            let size = self
                .stat_cache
                .stat(&path)
                .await
                .map(|stat| stat.size)
                .unwrap_or(0);

            let preview = is_preview(file_name);

            // Skip paying extraction cost for throwaway previews when
            // better options exist
            let duration_seconds = if !preview || audio_files.len() <= 2 {
                self.probe_duration(&path).await
            } else {
                0.0
            };

            let size_mb = size as f64 / (1024.0 * 1024.0);
            let mut score = 0.4 * size_mb
                + 0.4 * duration_seconds
                + if preview { 0.0 } else { NON_PREVIEW_BONUS }
                + if is_mp3(file_name) { MP3_BONUS } else { 0.0 };
            if preview {
                score *= PREVIEW_PENALTY;
            }

            debug!(
                "candidate {} size={} duration={:.1} score={:.2}",
                file_name, size, duration_seconds, score
            );

            // Zero-size files never win; first encountered keeps ties
            if size > 0 && score > best_score {
                best_score = score;
                best = Some(BestFile {
                    file_name: file_name.clone(),
                    size,
                    duration_seconds,
                });
            }
        }

        best
    }

    /// Probe a file's duration through the cache, tolerating failure
    async fn probe_duration(&self, path: &Path) -> f64 {
        match self.cache.get_or_extract(path, &self.reader).await {
            Ok((metadata, _)) => metadata.duration_seconds,
            Err(err) => {
                debug!("duration probe failed for {}: {}", path.display(), err);
                0.0
            }
        }
    }
}

/// Preview clips are named with "preview" or "short"
fn is_preview(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.contains("preview") || lower.contains("short")
}

fn is_mp3(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".mp3")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use beat_core::ExtractedTags;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Reader stub mapping file names to durations
    struct StubReader {
        durations: HashMap<String, f64>,
        calls: AtomicUsize,
    }

    impl StubReader {
        fn new(durations: &[(&str, f64)]) -> Self {
            Self {
                durations: durations
                    .iter()
                    .map(|(name, secs)| ((*name).to_string(), *secs))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl MetadataReader for StubReader {
        fn read(&self, path: &Path) -> beat_core::Result<ExtractedTags> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = path.file_name().unwrap().to_str().unwrap();
            match self.durations.get(name) {
                Some(secs) => Ok(ExtractedTags {
                    duration_seconds: *secs,
                    ..Default::default()
                }),
                None => Err(beat_core::BeatError::metadata("unknown file")),
            }
        }
    }

    fn selector_with(reader: StubReader, dir: &Path) -> (BestFileSelector, Arc<StubReader>) {
        let config = CacheConfig {
            cache_path: dir.join("cache.json"),
            stat_ttl: Duration::ZERO,
            ..Default::default()
        };
        let cache = Arc::new(MetadataCache::new(config));
        let reader = Arc::new(reader);
        let selector = BestFileSelector::new(cache, reader.clone());
        (selector, reader)
    }

    fn write_file(dir: &Path, name: &str, bytes: usize) {
        std::fs::write(dir.join(name), vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn preview_detection() {
        assert!(is_preview("Preview.mp3"));
        assert!(is_preview("audio_SHORT.ogg"));
        assert!(!is_preview("audio.mp3"));
    }

    #[tokio::test]
    async fn zero_candidates_yield_none() {
        let temp = tempfile::tempdir().unwrap();
        let (selector, _) = selector_with(StubReader::new(&[]), temp.path());
        assert!(selector.select_best(temp.path(), &[]).await.is_none());
    }

    #[tokio::test]
    async fn single_candidate_is_trusted_even_unreadable() {
        let temp = tempfile::tempdir().unwrap();
        let (selector, _) = selector_with(StubReader::new(&[]), temp.path());

        // The file does not exist; probes fail but the candidate is kept
        let best = selector
            .select_best(temp.path(), &["audio.mp3".to_string()])
            .await
            .unwrap();
        assert_eq!(best.file_name, "audio.mp3");
        assert_eq!(best.size, 0);
        assert_eq!(best.duration_seconds, 0.0);
    }

    #[tokio::test]
    async fn full_track_beats_smaller_shorter_preview() {
        let temp = tempfile::tempdir().unwrap();
        write_file(temp.path(), "preview.mp3", 50 * 1024);
        write_file(temp.path(), "full.mp3", 4 * 1024 * 1024);

        let reader = StubReader::new(&[("preview.mp3", 5.0), ("full.mp3", 180.0)]);
        let (selector, _) = selector_with(reader, temp.path());

        let files = vec!["preview.mp3".to_string(), "full.mp3".to_string()];
        let best = selector.select_best(temp.path(), &files).await.unwrap();
        assert_eq!(best.file_name, "full.mp3");
        assert_eq!(best.duration_seconds, 180.0);
    }

    #[tokio::test]
    async fn preview_duration_not_probed_with_three_or_more_candidates() {
        let temp = tempfile::tempdir().unwrap();
        write_file(temp.path(), "preview.mp3", 50 * 1024);
        write_file(temp.path(), "a.mp3", 3 * 1024 * 1024);
        write_file(temp.path(), "b.mp3", 4 * 1024 * 1024);

        let reader = StubReader::new(&[
            ("preview.mp3", 5.0),
            ("a.mp3", 170.0),
            ("b.mp3", 180.0),
        ]);
        let (selector, reader) = selector_with(reader, temp.path());

        let files = vec![
            "preview.mp3".to_string(),
            "a.mp3".to_string(),
            "b.mp3".to_string(),
        ];
        let best = selector.select_best(temp.path(), &files).await.unwrap();
        assert_eq!(best.file_name, "b.mp3");
        // Only the two non-preview candidates were extracted
        assert_eq!(reader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_size_files_never_win() {
        let temp = tempfile::tempdir().unwrap();
        write_file(temp.path(), "empty.mp3", 0);
        write_file(temp.path(), "real.ogg", 1024 * 1024);

        let reader = StubReader::new(&[("empty.mp3", 300.0), ("real.ogg", 90.0)]);
        let (selector, _) = selector_with(reader, temp.path());

        let files = vec!["empty.mp3".to_string(), "real.ogg".to_string()];
        let best = selector.select_best(temp.path(), &files).await.unwrap();
        assert_eq!(best.file_name, "real.ogg");
    }
}

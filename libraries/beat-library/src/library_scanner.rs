//! Library scanning and orchestration
//!
//! Walks the `Songs` directory of a library root, assembles per-folder
//! candidates, drives best-file selection and batched metadata extraction,
//! then deduplicates and sorts the published song list. Per-folder and
//! per-file errors are isolated; only a failure enumerating the top-level
//! `Songs` directory aborts a scan.

use crate::batch::{BatchProcessor, DEFAULT_CHUNK_SIZE};
use crate::cache::{CacheConfig, MetadataCache};
use crate::limiter::TaskLimiter;
use crate::pool::ObjectPool;
use crate::selector::BestFileSelector;
use crate::types::{BestFile, CacheStats, FolderCandidate, ScanOutcome, ScanProgress, ScanStats};
use crate::LibraryError;
use beat_core::{MetadataReader, SongRecord, TrackMetadata};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "ogg", "wav", "flac", "m4a"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "flv", "wmv", "mov"];

/// Lower bound on folders listed per batch
const MIN_FOLDER_BATCH: usize = 50;

/// Upper bound on folders listed per batch
const MAX_FOLDER_BATCH: usize = 200;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Items per extraction chunk
    pub chunk_size: usize,

    /// Folders listed between cooperative yields
    pub folder_batch_size: usize,

    /// Concurrent extraction bound
    pub max_concurrency: usize,

    /// Metadata cache configuration
    pub cache: CacheConfig,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        let cpus = num_cpus::get();
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            folder_batch_size: (cpus * 25).clamp(MIN_FOLDER_BATCH, MAX_FOLDER_BATCH),
            max_concurrency: cpus.clamp(4, 16),
            cache: CacheConfig::default(),
        }
    }
}

/// The library engine: scanning, caching, and the published song list
pub struct MusicLibrary {
    config: LibraryConfig,
    reader: Arc<dyn MetadataReader>,
    cache: Arc<MetadataCache>,
    selector: BestFileSelector,
    limiter: Arc<TaskLimiter>,
    song_pool: Arc<ObjectPool<SongRecord>>,
    songs: Mutex<Vec<SongRecord>>,
    filtered: Mutex<Vec<SongRecord>>,
    scanning: AtomicBool,
    cache_loaded: AtomicBool,
    last_hit_rate: Mutex<Option<f64>>,
    compactor: Mutex<Option<JoinHandle<()>>>,
}

impl MusicLibrary {
    /// Create an engine with the default lofty-backed reader
    pub fn new(config: LibraryConfig) -> Self {
        Self::with_reader(config, Arc::new(beat_metadata::LoftyTagReader::new()))
    }

    /// Create an engine with a caller-supplied metadata reader
    pub fn with_reader(config: LibraryConfig, reader: Arc<dyn MetadataReader>) -> Self {
        let cache = Arc::new(MetadataCache::new(config.cache.clone()));
        let selector = BestFileSelector::new(Arc::clone(&cache), Arc::clone(&reader));
        let limiter = Arc::new(TaskLimiter::new(config.max_concurrency));
        Self {
            config,
            reader,
            cache,
            selector,
            limiter,
            song_pool: Arc::new(ObjectPool::default()),
            songs: Mutex::new(Vec::new()),
            filtered: Mutex::new(Vec::new()),
            scanning: AtomicBool::new(false),
            cache_loaded: AtomicBool::new(false),
            last_hit_rate: Mutex::new(None),
            compactor: Mutex::new(None),
        }
    }

    /// Scan the library under `root`, publishing the resulting song list
    ///
    /// The library is expected to contain a `Songs` subdirectory with one
    /// folder per music set. Progress events are sent after each processed
    /// sub-batch when a channel is supplied. A scan requested while one is
    /// already in flight is rejected with a failed outcome.
    pub async fn scan(
        &self,
        root: &Path,
        progress: Option<mpsc::Sender<ScanProgress>>,
    ) -> ScanOutcome {
        if self.scanning.swap(true, Ordering::SeqCst) {
            return ScanOutcome::failure(LibraryError::ScanInProgress.to_string());
        }
        let _guard = ScanGuard(&self.scanning);

        if !self.cache_loaded.swap(true, Ordering::SeqCst) {
            self.cache.load().await;
        }
        self.ensure_compactor();

        let songs_path = root.join("Songs");
        match tokio::fs::metadata(&songs_path).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return ScanOutcome::failure(
                    LibraryError::SongsNotFound(songs_path.display().to_string()).to_string(),
                )
            }
        }

        info!("scanning library at {}", songs_path.display());

        let folders = match list_subdirectories(&songs_path).await {
            Ok(folders) => folders,
            Err(err) => {
                return ScanOutcome::failure(format!("Failed to list Songs folder: {}", err))
            }
        };

        // Assemble candidates in batches, yielding between batches so the
        // host process stays responsive
        let mut candidates = Vec::new();
        for batch in folders.chunks(self.config.folder_batch_size) {
            for (name, path) in batch {
                match build_candidate(name, path).await {
                    Ok(candidate) => {
                        if candidate.audio_files.is_empty() {
                            debug!("folder {} has no audio files", candidate.folder_id);
                        } else {
                            candidates.push(candidate);
                        }
                    }
                    Err(err) => warn!("skipping folder {}: {}", path.display(), err),
                }
            }
            tokio::task::yield_now().await;
        }

        let stats = Arc::new(Mutex::new(ScanStats::new(candidates.len())));

        let selected = self.select_candidates(candidates).await;
        let records = self.extract_metadata(selected, &stats, progress).await;
        let songs = self.dedup_and_sort(records).await;

        let (hit_rate, elapsed, processed, errors) = {
            let stats = stats.lock().unwrap();
            (
                stats.hit_rate(),
                stats.started_at.elapsed(),
                stats.processed,
                stats.errors,
            )
        };
        // The final rate stays queryable after the scan-scoped stats are
        // dropped
        *self.last_hit_rate.lock().unwrap() = Some(hit_rate);

        info!(
            "scan completed in {:?}: {} songs, {} processed, {} errors, {:.0}% cache hits",
            elapsed,
            songs.len(),
            processed,
            errors,
            hit_rate
        );

        // Persist asynchronously; the scan result does not wait on disk
        let cache = Arc::clone(&self.cache);
        tokio::spawn(async move {
            if let Err(err) = cache.save().await {
                warn!("background cache save failed: {}", err);
            }
        });

        *self.songs.lock().unwrap() = songs.clone();
        *self.filtered.lock().unwrap() = songs.clone();

        ScanOutcome {
            success: true,
            message: format!("Loaded {} songs", songs.len()),
            songs,
        }
    }

    /// Pick the best audio file per candidate, in folder batches
    async fn select_candidates(&self, candidates: Vec<FolderCandidate>) -> Vec<SelectedCandidate> {
        let mut selected = Vec::with_capacity(candidates.len());
        let mut iter = candidates.into_iter();
        loop {
            let batch: Vec<FolderCandidate> =
                iter.by_ref().take(self.config.folder_batch_size).collect();
            if batch.is_empty() {
                break;
            }

            let mut set = JoinSet::new();
            for candidate in batch {
                let selector = self.selector.clone();
                let limiter = Arc::clone(&self.limiter);
                set.spawn(async move {
                    let best = limiter
                        .run(0, async {
                            selector
                                .select_best(&candidate.folder_path, &candidate.audio_files)
                                .await
                        })
                        .await;
                    best.map(|best| SelectedCandidate { candidate, best })
                });
            }
            while let Some(joined) = set.join_next().await {
                if let Ok(Some(sel)) = joined {
                    selected.push(sel);
                }
            }
            tokio::task::yield_now().await;
        }
        selected
    }

    /// Extract metadata for every selected candidate through the batch
    /// processor
    async fn extract_metadata(
        &self,
        selected: Vec<SelectedCandidate>,
        stats: &Arc<Mutex<ScanStats>>,
        progress: Option<mpsc::Sender<ScanProgress>>,
    ) -> Vec<SongRecord> {
        let processor = BatchProcessor::new(Arc::clone(&self.limiter), self.config.chunk_size);

        let cache = Arc::clone(&self.cache);
        let reader = Arc::clone(&self.reader);
        let pool = Arc::clone(&self.song_pool);
        let action = move |sel: SelectedCandidate| {
            let cache = Arc::clone(&cache);
            let reader = Arc::clone(&reader);
            let pool = Arc::clone(&pool);
            async move {
                let audio_path = sel.candidate.folder_path.join(&sel.best.file_name);
                let (metadata, from_cache) = cache.get_or_extract(&audio_path, &reader).await?;

                let mut song = pool.acquire();
                fill_song(&mut song, &sel.candidate, &sel.best, &metadata, audio_path);
                Ok((song, from_cache))
            }
        };

        processor
            .process_all(selected, Arc::clone(stats), progress, action)
            .await
    }

    /// Collapse records resolving to the same audio path, then sort
    async fn dedup_and_sort(&self, records: Vec<SongRecord>) -> Vec<SongRecord> {
        let mut by_path: HashMap<PathBuf, SongRecord> = HashMap::with_capacity(records.len());
        for song in records {
            let resolved = tokio::fs::canonicalize(&song.audio_path)
                .await
                .unwrap_or_else(|_| song.audio_path.clone());
            match by_path.entry(resolved) {
                Entry::Vacant(slot) => {
                    slot.insert(song);
                }
                Entry::Occupied(mut slot) => {
                    // Larger file wins; the loser goes back to the pool
                    if song.file_size.unwrap_or(0) > slot.get().file_size.unwrap_or(0) {
                        let loser = slot.insert(song);
                        self.song_pool.release(loser);
                    } else {
                        self.song_pool.release(song);
                    }
                }
            }
        }

        let mut songs: Vec<SongRecord> = by_path.into_values().collect();
        songs.sort_by_key(|song| song.name.to_lowercase());
        songs
    }

    fn ensure_compactor(&self) {
        let mut slot = self.compactor.lock().unwrap();
        if slot.is_none() {
            let cache = Arc::clone(&self.cache);
            let interval = self.config.cache.compact_interval;
            *slot = Some(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                // The first tick completes immediately
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    cache.compact_if_needed();
                }
            }));
        }
    }

    /// Cache statistics for display
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Final hit rate of the most recently completed scan
    pub fn last_scan_hit_rate(&self) -> Option<f64> {
        *self.last_hit_rate.lock().unwrap()
    }

    /// Drop every cached metadata entry
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Persist the cache immediately, dirty or not
    pub async fn force_save_cache(&self) -> crate::Result<()> {
        self.cache.force_save().await
    }

    /// Flush the cache, release pooled resources, and stop background
    /// timers
    pub async fn destroy(&self) {
        if let Some(handle) = self.compactor.lock().unwrap().take() {
            handle.abort();
        }
        if let Err(err) = self.cache.save().await {
            warn!("cache save on destroy failed: {}", err);
        }
        self.cache.clear_pool();
        self.song_pool.clear();
        self.songs.lock().unwrap().clear();
        self.filtered.lock().unwrap().clear();
    }

    /// Filter the published songs by a case-insensitive substring of
    /// name, artist, or title
    pub fn filter_songs(&self, query: &str) {
        let songs = self.songs.lock().unwrap();
        let filtered = if query.trim().is_empty() {
            songs.clone()
        } else {
            let term = query.trim().to_lowercase();
            songs
                .iter()
                .filter(|song| {
                    song.name.to_lowercase().contains(&term)
                        || song.artist.to_lowercase().contains(&term)
                        || song.title.to_lowercase().contains(&term)
                })
                .cloned()
                .collect()
        };
        drop(songs);
        *self.filtered.lock().unwrap() = filtered;
    }

    /// The current filtered view of the published songs
    pub fn filtered_songs(&self) -> Vec<SongRecord> {
        self.filtered.lock().unwrap().clone()
    }

    /// Display names of every published song
    pub fn song_names(&self) -> Vec<String> {
        self.songs
            .lock()
            .unwrap()
            .iter()
            .map(|song| song.name.clone())
            .collect()
    }

    /// Look up a published song by display name
    pub fn get_song_by_name(&self, name: &str) -> Option<SongRecord> {
        self.songs
            .lock()
            .unwrap()
            .iter()
            .find(|song| song.name == name)
            .cloned()
    }
}

/// A candidate paired with its selected best file
struct SelectedCandidate {
    candidate: FolderCandidate,
    best: BestFile,
}

/// Clears the in-progress flag when a scan ends, however it ends
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// List the immediate subdirectories of `path` as (name, path) pairs
async fn list_subdirectories(path: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut folders = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let is_dir = entry
            .file_type()
            .await
            .map(|kind| kind.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            folders.push((name, entry.path()));
        }
    }
    Ok(folders)
}

/// List a folder's entries once and classify them by extension
async fn build_candidate(name: &str, path: &Path) -> std::io::Result<FolderCandidate> {
    let mut audio_files = Vec::new();
    let mut image_files = Vec::new();
    let mut video_files = Vec::new();

    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        match classify_extension(&file_name) {
            Some(FileKind::Audio) => audio_files.push(file_name),
            Some(FileKind::Image) => image_files.push(file_name),
            Some(FileKind::Video) => video_files.push(file_name),
            None => {}
        }
    }

    let (beatmapset_id, display_name) = parse_folder_name(name);

    Ok(FolderCandidate {
        folder_id: name.to_string(),
        beatmapset_id,
        display_name,
        folder_path: path.to_path_buf(),
        audio_files,
        image_files,
        video_files,
    })
}

enum FileKind {
    Audio,
    Image,
    Video,
}

fn classify_extension(file_name: &str) -> Option<FileKind> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_lowercase();
    if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Audio)
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(FileKind::Video)
    } else {
        None
    }
}

/// Split a folder name into (beatmapset id, display name)
///
/// Beatmap folders are conventionally named `<id> <Artist> - <Title>`; a
/// folder without a space has no id.
fn parse_folder_name(name: &str) -> (Option<String>, String) {
    match name.split_once(' ') {
        Some((id, rest)) => (Some(id.to_string()), rest.to_string()),
        None => (None, name.to_string()),
    }
}

/// Background images are preferred by name, then any image
fn pick_image(candidate: &FolderCandidate) -> Option<PathBuf> {
    let by_name = candidate.image_files.iter().find(|name| {
        let lower = name.to_lowercase();
        lower.contains("bg") || lower.contains("background")
    });
    by_name
        .or_else(|| candidate.image_files.first())
        .map(|name| candidate.folder_path.join(name))
}

/// Populate a pooled song record from a candidate and its metadata
fn fill_song(
    song: &mut SongRecord,
    candidate: &FolderCandidate,
    best: &BestFile,
    metadata: &TrackMetadata,
    audio_path: PathBuf,
) {
    song.name.push_str(&candidate.display_name);
    song.audio_path = audio_path;
    song.beatmapset_id = candidate.beatmapset_id.clone();
    song.image_path = pick_image(candidate);
    song.video_path = candidate
        .video_files
        .first()
        .map(|name| candidate.folder_path.join(name));
    song.duration_seconds = metadata.duration_seconds;
    song.bitrate = metadata.bitrate;
    song.file_size = (best.size > 0).then_some(best.size);
    song.audio_file_count = candidate.audio_files.len();

    // Tags win; the folder name's "Artist - Title" convention fills the
    // gaps
    if metadata.artist.is_empty() || metadata.title.is_empty() {
        let (folder_artist, folder_title) = split_display_name(&candidate.display_name);
        if metadata.artist.is_empty() {
            song.artist.push_str(folder_artist);
        } else {
            song.artist.push_str(&metadata.artist);
        }
        if metadata.title.is_empty() {
            song.title.push_str(folder_title);
        } else {
            song.title.push_str(&metadata.title);
        }
    } else {
        song.artist.push_str(&metadata.artist);
        song.title.push_str(&metadata.title);
    }
}

/// Split `Artist - Title` display names; a name without the separator is
/// all title
fn split_display_name(display_name: &str) -> (&str, &str) {
    match display_name.split_once(" - ") {
        Some((artist, title)) => (artist.trim(), title.trim()),
        None => ("", display_name.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_name_parsing() {
        assert_eq!(
            parse_folder_name("123456 Artist - Title"),
            (Some("123456".to_string()), "Artist - Title".to_string())
        );
        assert_eq!(parse_folder_name("NoId"), (None, "NoId".to_string()));
    }

    #[test]
    fn display_name_splitting() {
        assert_eq!(split_display_name("Artist - Title"), ("Artist", "Title"));
        assert_eq!(split_display_name("Just A Title"), ("", "Just A Title"));
        assert_eq!(
            split_display_name("A - B - C"),
            ("A", "B - C"),
        );
    }

    #[test]
    fn extension_classification_is_case_insensitive() {
        assert!(matches!(classify_extension("a.MP3"), Some(FileKind::Audio)));
        assert!(matches!(classify_extension("a.Jpeg"), Some(FileKind::Image)));
        assert!(matches!(classify_extension("a.mp4"), Some(FileKind::Video)));
        assert!(classify_extension("a.txt").is_none());
        assert!(classify_extension("noext").is_none());
    }

    #[test]
    fn image_preference_favors_backgrounds() {
        let candidate = FolderCandidate {
            folder_id: "1 A - B".to_string(),
            beatmapset_id: Some("1".to_string()),
            display_name: "A - B".to_string(),
            folder_path: PathBuf::from("/songs/1 A - B"),
            audio_files: vec![],
            image_files: vec!["cover.jpg".to_string(), "BG.png".to_string()],
            video_files: vec![],
        };
        assert_eq!(
            pick_image(&candidate),
            Some(PathBuf::from("/songs/1 A - B/BG.png"))
        );
    }

    #[tokio::test]
    async fn dedup_keeps_the_larger_of_two_records() {
        let library = MusicLibrary::new(LibraryConfig::default());
        let pooled_before = library.song_pool.available();

        // Both records resolve to the same (nonexistent) path
        let path = PathBuf::from("/songs/shared/audio.mp3");
        let mut small = SongRecord::new("Small", path.clone());
        small.file_size = Some(1024);
        let mut large = SongRecord::new("Large", path);
        large.file_size = Some(4096);

        let songs = library.dedup_and_sort(vec![small, large]).await;
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].name, "Large");
        // The loser went back to the pool
        assert_eq!(library.song_pool.available(), pooled_before + 1);
    }

    #[test]
    fn config_defaults_are_clamped() {
        let config = LibraryConfig::default();
        assert!(config.folder_batch_size >= MIN_FOLDER_BATCH);
        assert!(config.folder_batch_size <= MAX_FOLDER_BATCH);
        assert!(config.max_concurrency >= 4);
        assert!(config.max_concurrency <= 16);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }
}

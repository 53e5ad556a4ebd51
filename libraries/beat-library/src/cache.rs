//! Persistent path-keyed metadata cache with LRU eviction
//!
//! A cached entry is valid when its stored content hash matches a freshly
//! computed hash of (path, mtime, size, inode) and its stored mtime/size
//! match the current stat. Valid hits bump the entry's LRU position and
//! skip extraction entirely; misses extract, store a pooled entry, and mark
//! the cache dirty for the next asynchronous save.

use crate::fs::{FileStat, StatCache};
use crate::pool::ObjectPool;
use crate::types::CacheStats;
use crate::LibraryError;
use beat_core::{ExtractedTags, MetadataReader, TrackMetadata};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache files above this size are deserialized from a buffered reader
/// instead of one in-memory string
const LARGE_CACHE_BYTES: u64 = 10 * 1024 * 1024;

/// Extraction retries for transient OS errors
const EXTRACT_RETRIES: u32 = 2;

/// Linear backoff step between retries
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry ceiling before eviction kicks in
    pub max_entries: usize,

    /// Location of the persisted cache file
    pub cache_path: PathBuf,

    /// TTL for cached filesystem stats
    pub stat_ttl: Duration,

    /// Interval between background compaction passes
    pub compact_interval: Duration,

    /// Occupancy (fraction of the ceiling) above which compaction evicts
    pub compact_threshold: f64,

    /// Fraction of entries dropped per eviction pass
    pub evict_fraction: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 2000,
            cache_path: std::env::temp_dir()
                .join("beat-player")
                .join("metadata-cache.json"),
            stat_ttl: Duration::from_secs(30),
            compact_interval: Duration::from_secs(180),
            compact_threshold: 0.75,
            evict_fraction: 0.2,
        }
    }
}

struct CacheInner {
    entries: LruCache<PathBuf, TrackMetadata>,
    dirty: bool,
    hits: u64,
    lookups: u64,
}

/// Persistent metadata cache keyed by absolute file path
pub struct MetadataCache {
    config: CacheConfig,
    stat_cache: Arc<StatCache>,
    pool: ObjectPool<TrackMetadata>,
    inner: Mutex<CacheInner>,
}

impl MetadataCache {
    /// Create an empty cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        let stat_cache = Arc::new(StatCache::new(config.stat_ttl));
        Self {
            config,
            stat_cache,
            pool: ObjectPool::default(),
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                dirty: false,
                hits: 0,
                lookups: 0,
            }),
        }
    }

    /// The stat cache shared with the selector
    pub fn stat_cache(&self) -> Arc<StatCache> {
        Arc::clone(&self.stat_cache)
    }

    /// Stat-derived fingerprint used to detect file changes without
    /// re-reading content
    pub fn content_hash(path: &Path, stat: &FileStat) -> String {
        let mut hasher = Sha256::new();
        hasher.update(path.display().to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(stat.mtime.to_le_bytes());
        hasher.update(b"|");
        hasher.update(stat.size.to_le_bytes());
        hasher.update(b"|");
        hasher.update(stat.inode.unwrap_or(0).to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Look up metadata for a path, validating against the current stat
    ///
    /// A valid hit bumps the entry's LRU position; a stale entry is dropped
    /// and `None` is returned.
    pub async fn get(&self, path: &Path) -> Option<TrackMetadata> {
        let stat = self.stat_cache.stat(path).await.ok()?;
        let hash = Self::content_hash(path, &stat);
        self.lookup_valid(path, &stat, &hash)
    }

    /// Insert metadata for a path, evicting when the ceiling is exceeded
    pub fn put(&self, path: &Path, metadata: TrackMetadata) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(previous) = inner.entries.put(path.to_path_buf(), metadata) {
            self.pool.release(previous);
        }
        inner.dirty = true;
        if inner.entries.len() > self.config.max_entries {
            self.evict_locked(&mut inner);
        }
    }

    /// Fetch metadata for a path, extracting on miss
    ///
    /// Returns the metadata and whether it was served from cache.
    /// Extraction is retried with linear backoff for transient OS errors.
    pub async fn get_or_extract(
        &self,
        path: &Path,
        reader: &Arc<dyn MetadataReader>,
    ) -> crate::Result<(TrackMetadata, bool)> {
        let stat = self.stat_cache.stat(path).await?;
        let hash = Self::content_hash(path, &stat);

        if let Some(metadata) = self.lookup_valid(path, &stat, &hash) {
            return Ok((metadata, true));
        }

        let tags = read_with_retry(reader.as_ref(), path).await?;

        let mut entry = self.pool.acquire();
        entry.apply_tags(&tags);
        entry.source_mtime = stat.mtime;
        entry.source_size = stat.size;
        entry.content_hash = hash;

        let metadata = entry.clone();
        self.put(path, entry);
        Ok((metadata, false))
    }

    fn lookup_valid(&self, path: &Path, stat: &FileStat, hash: &str) -> Option<TrackMetadata> {
        let mut inner = self.inner.lock().unwrap();
        inner.lookups += 1;

        let valid = inner.entries.get(path).map(|entry| {
            entry.content_hash == hash
                && entry.source_mtime == stat.mtime
                && entry.source_size == stat.size
        });

        match valid {
            Some(true) => {
                inner.hits += 1;
                inner.entries.get(path).cloned()
            }
            Some(false) => {
                debug!("cache entry stale for {}", path.display());
                if let Some(stale) = inner.entries.pop(path) {
                    self.pool.release(stale);
                }
                inner.dirty = true;
                None
            }
            None => None,
        }
    }

    /// Drop the least-recently-used fraction of entries in one pass
    fn evict_locked(&self, inner: &mut CacheInner) {
        let count = ((inner.entries.len() as f64) * self.config.evict_fraction).ceil() as usize;
        for _ in 0..count {
            match inner.entries.pop_lru() {
                Some((_, stale)) => self.pool.release(stale),
                None => break,
            }
        }
        inner.dirty = true;
        debug!("evicted {} cache entries, {} remain", count, inner.entries.len());
    }

    /// Evict when occupancy has passed the compaction threshold
    ///
    /// Invoked periodically so steady-state memory stays bounded under
    /// long-running processes.
    pub fn compact_if_needed(&self) {
        let mut inner = self.inner.lock().unwrap();
        let occupancy = inner.entries.len() as f64 / self.config.max_entries as f64;
        if occupancy > self.config.compact_threshold {
            info!(
                "cache compaction at {:.0}% occupancy ({} entries)",
                occupancy * 100.0,
                inner.entries.len()
            );
            self.evict_locked(&mut inner);
        }
    }

    /// Load the persisted cache file
    ///
    /// A missing or unparseable file is treated as an empty cache.
    pub async fn load(&self) {
        let path = self.config.cache_path.clone();
        let loaded = tokio::task::spawn_blocking(move || read_cache_file(&path))
            .await
            .unwrap_or_default();

        if loaded.is_empty() {
            return;
        }

        let mut inner = self.inner.lock().unwrap();
        let count = loaded.len();
        for (key, metadata) in loaded {
            inner.entries.put(PathBuf::from(key), metadata);
        }
        if inner.entries.len() > self.config.max_entries {
            self.evict_locked(&mut inner);
        }
        // Freshly loaded state matches disk
        inner.dirty = false;
        info!("loaded {} cached metadata entries", count);
    }

    /// Persist the cache if it has unsaved changes
    pub async fn save(&self) -> crate::Result<()> {
        if !self.inner.lock().unwrap().dirty {
            return Ok(());
        }
        self.force_save().await
    }

    /// Persist the cache unconditionally
    pub async fn force_save(&self) -> crate::Result<()> {
        // Compact JSON object path -> metadata, no pretty printing
        let payload = {
            let inner = self.inner.lock().unwrap();
            let map: HashMap<String, &TrackMetadata> = inner
                .entries
                .iter()
                .map(|(k, v)| (k.display().to_string(), v))
                .collect();
            serde_json::to_string(&map)?
        };

        if let Some(parent) = self.config.cache_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.config.cache_path, payload).await?;

        self.inner.lock().unwrap().dirty = false;
        debug!("cache saved to {}", self.config.cache_path.display());
        Ok(())
    }

    /// Drop every cached entry and forget cached stats
    pub fn invalidate_all(&self) {
        let mut inner = self.inner.lock().unwrap();
        while let Some((_, stale)) = inner.entries.pop_lru() {
            self.pool.release(stale);
        }
        inner.dirty = true;
        self.stat_cache.clear();
    }

    /// Release pooled instances held for reuse
    pub fn clear_pool(&self) {
        self.pool.clear();
    }

    /// Current cache statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap();
        let hit_rate = if inner.lookups == 0 {
            0.0
        } else {
            ((inner.hits as f64 / inner.lookups as f64) * 100.0).min(100.0)
        };

        let bytes: usize = inner
            .entries
            .iter()
            .map(|(key, entry)| approximate_entry_bytes(key, entry))
            .sum();

        CacheStats {
            size: inner.entries.len(),
            max_size: self.config.max_entries,
            hit_rate,
            memory_usage: format_bytes(bytes),
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether unsaved changes exist
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().unwrap().dirty
    }

    /// Paths currently cached, most recently used first
    pub fn cached_paths(&self) -> Vec<PathBuf> {
        let inner = self.inner.lock().unwrap();
        inner.entries.iter().map(|(k, _)| k.clone()).collect()
    }
}

/// Read and parse the cache file, tolerating any failure as an empty cache
fn read_cache_file(path: &Path) -> HashMap<String, TrackMetadata> {
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(_) => return HashMap::new(),
    };

    let parsed: Result<HashMap<String, TrackMetadata>, _> = if meta.len() > LARGE_CACHE_BYTES {
        // Deserialize incrementally from the stream rather than
        // materializing one large string
        std::fs::File::open(path)
            .map_err(serde_json::Error::io)
            .and_then(|file| serde_json::from_reader(BufReader::new(file)))
    } else {
        match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text),
            Err(err) => {
                warn!("failed to read cache file: {}", err);
                return HashMap::new();
            }
        }
    };

    match parsed {
        Ok(map) => map,
        Err(err) => {
            warn!("cache file unparseable, starting empty: {}", err);
            HashMap::new()
        }
    }
}

/// Extract metadata, retrying transient OS errors with linear backoff
async fn read_with_retry(
    reader: &dyn MetadataReader,
    path: &Path,
) -> Result<ExtractedTags, LibraryError> {
    let mut attempt: u32 = 0;
    loop {
        match reader.read(path) {
            Ok(tags) => return Ok(tags),
            Err(err) if err.is_transient() && attempt < EXTRACT_RETRIES => {
                attempt += 1;
                debug!(
                    "transient error reading {} (attempt {}): {}",
                    path.display(),
                    attempt,
                    err
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn approximate_entry_bytes(key: &Path, entry: &TrackMetadata) -> usize {
    std::mem::size_of::<TrackMetadata>()
        + key.as_os_str().len()
        + entry.artist.len()
        + entry.title.len()
        + entry.album.as_ref().map_or(0, String::len)
        + entry.content_hash.len()
        + entry.genres.iter().map(String::len).sum::<usize>()
}

fn format_bytes(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

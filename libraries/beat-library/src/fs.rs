//! Filesystem stat caching
//!
//! The selector and the extractor both probe the same paths within one
//! scan; a short-TTL stat cache keeps that from turning into redundant
//! syscalls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, UNIX_EPOCH};

/// Snapshot of the stat fields the engine cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Size in bytes
    pub size: u64,

    /// Modification time, seconds since epoch (0 when unavailable)
    pub mtime: i64,

    /// Inode number on platforms that expose one
    pub inode: Option<u64>,
}

impl FileStat {
    /// Build a snapshot from filesystem metadata
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        #[cfg(unix)]
        let inode = {
            use std::os::unix::fs::MetadataExt;
            Some(meta.ino())
        };
        #[cfg(not(unix))]
        let inode = None;

        Self {
            size: meta.len(),
            mtime,
            inode,
        }
    }
}

/// Per-path stat cache with a short TTL
pub struct StatCache {
    ttl: Duration,
    entries: Mutex<HashMap<PathBuf, (Instant, FileStat)>>,
}

impl StatCache {
    /// Create a stat cache with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stat a path, serving from cache when a fresh entry exists
    pub async fn stat(&self, path: &Path) -> std::io::Result<FileStat> {
        {
            let entries = self.entries.lock().unwrap();
            if let Some((at, stat)) = entries.get(path) {
                if at.elapsed() < self.ttl {
                    return Ok(*stat);
                }
            }
        }

        let meta = tokio::fs::metadata(path).await?;
        let stat = FileStat::from_metadata(&meta);
        self.entries
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), (Instant::now(), stat));
        Ok(stat)
    }

    /// Drop the cached entry for one path
    pub fn invalidate(&self, path: &Path) {
        self.entries.lock().unwrap().remove(path);
    }

    /// Drop all cached entries
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

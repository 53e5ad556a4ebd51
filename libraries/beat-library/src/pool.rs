//! Reusable record buffers
//!
//! Large libraries produce tens of thousands of metadata and song records
//! per scan; pooling them keeps allocation churn down. The pool is a pure
//! performance optimization with no behavioral effect: `Reset` restores a
//! released value to its zero state (keeping container allocations) before
//! it can be handed out again.

use beat_core::{SongRecord, TrackMetadata};
use std::sync::Mutex;

/// Default bound on the free list
pub const DEFAULT_POOL_CAPACITY: usize = 20;

/// Default number of instances created up front
pub const DEFAULT_POOL_PREWARM: usize = 8;

/// Restore a value to its zero state, preserving allocations where possible
pub trait Reset {
    fn reset(&mut self);
}

impl Reset for TrackMetadata {
    fn reset(&mut self) {
        self.duration_seconds = 0.0;
        self.artist.clear();
        self.title.clear();
        self.album = None;
        self.year = None;
        self.genres.clear();
        self.bitrate = None;
        self.sample_rate = None;
        self.source_mtime = 0;
        self.source_size = 0;
        self.content_hash.clear();
    }
}

impl Reset for SongRecord {
    fn reset(&mut self) {
        self.name.clear();
        self.audio_path.clear();
        self.beatmapset_id = None;
        self.image_path = None;
        self.video_path = None;
        self.artist.clear();
        self.title.clear();
        self.duration_seconds = 0.0;
        self.bitrate = None;
        self.file_size = None;
        self.audio_file_count = 0;
    }
}

/// Bounded free list of reusable values
pub struct ObjectPool<T> {
    free: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T: Reset + Default> ObjectPool<T> {
    /// Create a pool bounded at `capacity`, pre-warmed with `prewarm`
    /// instances
    pub fn new(capacity: usize, prewarm: usize) -> Self {
        let free = (0..prewarm.min(capacity)).map(|_| T::default()).collect();
        Self {
            free: Mutex::new(free),
            capacity,
        }
    }

    /// Take a value from the pool, allocating only when the pool is empty
    pub fn acquire(&self) -> T {
        self.free.lock().unwrap().pop().unwrap_or_default()
    }

    /// Return a value to the pool
    ///
    /// The value is reset before it becomes available again; it is dropped
    /// instead when the free list is full.
    pub fn release(&self, mut value: T) {
        value.reset();
        let mut free = self.free.lock().unwrap();
        if free.len() < self.capacity {
            free.push(value);
        }
    }

    /// Drop every pooled instance
    pub fn clear(&self) {
        self.free.lock().unwrap().clear();
    }

    /// Number of values currently available
    pub fn available(&self) -> usize {
        self.free.lock().unwrap().len()
    }
}

impl<T: Reset + Default> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY, DEFAULT_POOL_PREWARM)
    }
}

//! Beat Player Library Engine
//!
//! Scans a beatmap library on disk, extracts audio metadata for the best
//! candidate file in each folder, and maintains a persistent on-disk cache
//! so repeated scans of an unchanged library are near-instant.
//!
//! # Architecture
//!
//! - `cache`: persistent path-keyed metadata cache with LRU eviction
//! - `pool`: reusable record buffers to reduce allocation churn
//! - `limiter`: bounded worker admission with priority ordering
//! - `selector`: per-folder scoring to pick the canonical audio track
//! - `batch`: chunked processing with progress reporting
//! - `library_scanner`: directory traversal and orchestration
//!
//! # Example
//!
//! ```rust,no_run
//! use beat_library::{LibraryConfig, MusicLibrary};
//! use std::path::Path;
//! # async fn example() {
//! let library = MusicLibrary::new(LibraryConfig::default());
//! let outcome = library.scan(Path::new("/home/user/osu"), None).await;
//! println!("{}: {} songs", outcome.message, outcome.songs.len());
//! # }
//! ```

mod error;
mod types;

// Core modules
pub mod batch;
pub mod cache;
pub mod fs;
pub mod library_scanner;
pub mod limiter;
pub mod pool;
pub mod selector;

pub use batch::BatchProcessor;
pub use cache::{CacheConfig, MetadataCache};
pub use error::LibraryError;
pub use fs::{FileStat, StatCache};
pub use library_scanner::{LibraryConfig, MusicLibrary};
pub use limiter::TaskLimiter;
pub use pool::{ObjectPool, Reset};
pub use selector::BestFileSelector;
pub use types::*;

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, LibraryError>;

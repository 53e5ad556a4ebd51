//! Beat Player Core
//!
//! Platform-agnostic core types, traits, and error handling for Beat Player.
//!
//! This crate provides the foundational building blocks shared by the
//! metadata extractor and the library scanning engine.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `TrackMetadata`, `ExtractedTags`, `SongRecord`
//! - **Core Traits**: `MetadataReader`
//! - **Error Handling**: Unified `BeatError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use beat_core::{SongRecord, TrackMetadata};
//! use std::path::PathBuf;
//!
//! let mut song = SongRecord::new("Artist - Title", PathBuf::from("/songs/123/audio.mp3"));
//! song.artist = "Artist".to_string();
//! song.title = "Title".to_string();
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{BeatError, Result};
pub use traits::MetadataReader;
pub use types::{format_time, ExtractedTags, SongRecord, TrackMetadata};

//! Beat Player Metadata
//!
//! Tag and stream-property extraction for Beat Player.
//!
//! This crate provides:
//! - Tag reading from audio files (MP3, OGG, FLAC, WAV, M4A)
//! - Duration, bitrate, and sample rate from stream properties
//! - Multi-delimiter genre splitting
//!
//! # Example
//!
//! ```rust,no_run
//! use beat_metadata::LoftyTagReader;
//! use beat_core::MetadataReader;
//! use std::path::Path;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = LoftyTagReader::new();
//! let tags = reader.read(Path::new("/songs/123 Artist - Title/audio.mp3"))?;
//! println!("{:?} ({}s)", tags.title, tags.duration_seconds);
//! # Ok(())
//! # }
//! ```

mod error;
mod reader;

pub use error::{MetadataError, Result};
pub use reader::LoftyTagReader;

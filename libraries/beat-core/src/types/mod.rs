//! Domain types for Beat Player

mod metadata;
mod song;

pub use metadata::{ExtractedTags, TrackMetadata};
pub use song::{format_time, SongRecord};

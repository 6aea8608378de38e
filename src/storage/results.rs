//! Storage result types
//!
//! Defines result structures returned by storage operations.

use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

/// Status of a path as reported by `stat`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Final path component only
    pub name: String,
    pub size: u64,
    /// Last modification, Unix seconds
    pub mod_time: i64,
    pub is_dir: bool,
    /// Set when the path is gone but its parent directory still exists
    pub deleted: bool,
}

impl FileInfo {
    /// Marker for a path missing from a directory that still exists.
    pub fn deleted_marker() -> Self {
        Self {
            deleted: true,
            ..Self::default()
        }
    }

    pub fn from_metadata(name: String, metadata: &Metadata) -> Self {
        Self {
            name,
            size: metadata.len(),
            mod_time: metadata.modified().map(unix_seconds).unwrap_or(0),
            is_dir: metadata.is_dir(),
            deleted: false,
        }
    }
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

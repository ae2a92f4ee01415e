//! Persisted metadata index.
//!
//! The index is stored as `cache_index.json` in the cache directory. It
//! records one metadata record per entry so a new session can inspect
//! what the previous one had cached. Payloads are never persisted; they
//! live only in device memory for the process lifetime.

use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::entry::{ArtifactKind, CacheEntry, SourceDescriptor};
use crate::error::CacheError;

/// File name of the index within the cache directory.
pub const INDEX_FILE: &str = "cache_index.json";

/// Current index format version. Increment on breaking changes to the
/// record layout.
const INDEX_FORMAT_VERSION: u32 = 1;

/// Snapshot of all entry metadata, serialized as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheIndex {
    /// Index format version for compatibility checks.
    pub format_version: u32,
    /// When this snapshot was written.
    pub saved_at: SystemTime,
    /// One record per entry, ordered most recently used first.
    pub entries: Vec<IndexRecord>,
}

/// Persisted metadata for a single cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// The entry's cache key.
    pub key: String,
    /// The artifact category.
    pub kind: ArtifactKind,
    /// Measured payload size at insertion time.
    pub size_bytes: u64,
    /// When the entry was created.
    pub created_at: SystemTime,
    /// When the entry was last retrieved.
    pub last_accessed_at: SystemTime,
    /// Number of successful retrievals recorded so far.
    pub access_count: u64,
    /// Origin of the payload, when file-backed.
    pub source: Option<SourceDescriptor>,
}

impl IndexRecord {
    /// Captures the persistable metadata of a live entry.
    pub fn from_entry(entry: &CacheEntry) -> Self {
        Self {
            key: entry.key.clone(),
            kind: entry.kind(),
            size_bytes: entry.size_bytes,
            created_at: entry.created_at,
            last_accessed_at: entry.last_accessed_at,
            access_count: entry.access_count,
            source: entry.source.clone(),
        }
    }
}

impl CacheIndex {
    /// Creates a snapshot from entry records.
    pub fn new(entries: Vec<IndexRecord>) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            saved_at: SystemTime::now(),
            entries,
        }
    }

    /// Loads the index from the given file, returning `None` if the file
    /// doesn't exist, can't be parsed, or has an incompatible format
    /// version.
    ///
    /// Fail-safe: any problem results in `None` and the manager starts
    /// with an empty store.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let index: Self = serde_json::from_str(&content).ok()?;
        if index.format_version != INDEX_FORMAT_VERSION {
            return None;
        }
        Some(index)
    }

    /// Writes the index to the given file as pretty-printed JSON.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

//! Device-memory model artifact caching.
//!
//! This crate keeps large model artifacts (checkpoints, LoRAs, VAEs and
//! friends) resident in device memory across workflow executions, so that
//! repeated runs skip redundant disk loads and host-to-device transfers.
//! Payloads live only for the process lifetime; entry metadata is
//! persisted to a JSON index for cross-session introspection.

#![warn(missing_docs)]

pub mod capacity;
pub mod config;
pub mod device;
pub mod entry;
pub mod error;
pub mod identity;
pub mod index;
pub mod lru;
pub mod manager;

pub use capacity::{CacheLimit, CapacityTracker};
pub use config::{AdmissionPolicy, CacheConfig};
pub use device::{DeviceMemoryProbe, DeviceMemoryReport};
pub use entry::{ArtifactHandle, ArtifactKind, CacheEntry, LoadedArtifact, SourceDescriptor};
pub use error::{CacheError, LoaderError};
pub use identity::resolve_key;
pub use manager::{CacheStats, EntryInfo, ModelCache};

//! Cache entry types: artifact kinds, payload handles, and source
//! descriptors.
//!
//! Payloads are opaque to the cache. The store stays homogeneous by
//! wrapping every payload in an [`ArtifactHandle`] tagged with its
//! [`ArtifactKind`]; callers recover a typed handle at the boundary via
//! downcast.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

/// Category of a cached model artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// A full checkpoint (UNet + CLIP + VAE bundle).
    Checkpoint,
    /// A low-rank adaptation module.
    Lora,
    /// A variational autoencoder.
    Vae,
    /// A ControlNet conditioning model.
    Controlnet,
    /// A text encoder.
    Clip,
    /// A standalone diffusion model.
    DiffusionModel,
    /// Kind not specified or not recognized.
    Auto,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Checkpoint => "checkpoint",
            Self::Lora => "lora",
            Self::Vae => "vae",
            Self::Controlnet => "controlnet",
            Self::Clip => "clip",
            Self::DiffusionModel => "diffusion-model",
            Self::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// Shared handle to a cached payload, tagged with its kind.
///
/// The handle is either *resident* (backed by a live device-memory
/// payload) or *vacant* (metadata rehydrated from the persisted index;
/// the payload did not survive the previous process). Cloning a resident
/// handle shares the payload; the last clone dropped releases it.
#[derive(Clone)]
pub struct ArtifactHandle {
    kind: ArtifactKind,
    data: ArtifactData,
}

#[derive(Clone)]
enum ArtifactData {
    Resident(Arc<dyn Any + Send + Sync>),
    Vacant,
}

impl ArtifactHandle {
    /// Wraps a loaded payload of any type in a resident handle.
    pub fn resident<T: Any + Send + Sync>(kind: ArtifactKind, payload: T) -> Self {
        Self {
            kind,
            data: ArtifactData::Resident(Arc::new(payload)),
        }
    }

    /// Creates a payload-less handle for an index-rehydrated entry.
    pub(crate) fn vacant(kind: ArtifactKind) -> Self {
        Self {
            kind,
            data: ArtifactData::Vacant,
        }
    }

    /// The artifact category this handle was tagged with.
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Returns `true` if a live payload backs this handle.
    pub fn is_resident(&self) -> bool {
        matches!(self.data, ArtifactData::Resident(_))
    }

    /// Recovers the typed payload, if this handle is resident and was
    /// created with a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match &self.data {
            ArtifactData::Resident(payload) => Arc::clone(payload).downcast::<T>().ok(),
            ArtifactData::Vacant => None,
        }
    }
}

impl fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_resident() { "resident" } else { "vacant" };
        write!(f, "ArtifactHandle({}, {state})", self.kind)
    }
}

/// Origin of a file-backed artifact, captured at key-derivation time.
///
/// Stored alongside the entry so that diagnostics can show where a cached
/// payload came from, and persisted with the index. A change to any field
/// produces a different fingerprint key, so a stale descriptor can never
/// be confused with a fresh load of the same path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Canonical path of the source file.
    pub path: PathBuf,
    /// Modification time of the source file when it was fingerprinted.
    pub mtime: SystemTime,
    /// Size of the source file in bytes when it was fingerprinted.
    pub size_bytes: u64,
}

/// A freshly loaded artifact handed to the cache for insertion.
///
/// Produced by a loader collaborator (the only place disk I/O and device
/// transfers happen) or constructed directly by callers that already hold
/// a payload produced mid-workflow.
pub struct LoadedArtifact {
    /// The payload handle, tagged with its kind.
    pub payload: ArtifactHandle,
    /// Measured size of the payload in device memory.
    pub size_bytes: u64,
    /// Where the payload came from, when file-backed.
    pub source: Option<SourceDescriptor>,
}

/// A single cache entry: payload handle plus bookkeeping metadata.
#[derive(Clone)]
pub struct CacheEntry {
    /// Unique key: a content fingerprint or a user-assigned name.
    pub key: String,
    /// The payload handle (resident or vacant).
    pub payload: ArtifactHandle,
    /// Measured payload size at insertion time.
    pub size_bytes: u64,
    /// When the entry was created.
    pub created_at: SystemTime,
    /// When the entry was last successfully retrieved.
    pub last_accessed_at: SystemTime,
    /// Number of successful retrievals.
    pub access_count: u64,
    /// Monotonic recency sequence; higher means more recently touched.
    /// Assigned on insertion and every retrieval, so it also encodes the
    /// insertion-order tiebreak for eviction.
    pub touch_seq: u64,
    /// Origin of the payload, when file-backed.
    pub source: Option<SourceDescriptor>,
}

impl CacheEntry {
    /// Bytes of device memory this entry actually occupies.
    ///
    /// Vacant entries hold no payload and occupy nothing.
    pub fn resident_bytes(&self) -> u64 {
        if self.payload.is_resident() {
            self.size_bytes
        } else {
            0
        }
    }

    /// The artifact category of the payload.
    pub fn kind(&self) -> ArtifactKind {
        self.payload.kind()
    }

    /// Records a successful retrieval.
    pub fn touch(&mut self, seq: u64) {
        self.touch_seq = seq;
        self.last_accessed_at = SystemTime::now();
        self.access_count += 1;
    }
}

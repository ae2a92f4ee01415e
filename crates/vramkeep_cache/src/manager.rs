//! The cache manager façade.
//!
//! [`ModelCache`] ties together key identity, capacity tracking, LRU
//! eviction, and the persisted metadata index behind a single coarse
//! lock. One instance is constructed at session start and shared by every
//! workflow node; cache operations are cheap next to the model loads they
//! avoid, so the coarse lock is not a bottleneck.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tracing::{debug, info, warn};
use vramkeep_common::format_bytes;

use crate::capacity::{CacheLimit, CapacityTracker};
use crate::config::{AdmissionPolicy, CacheConfig};
use crate::device::{DeviceMemoryProbe, DeviceMemoryReport};
use crate::entry::{ArtifactHandle, ArtifactKind, CacheEntry, LoadedArtifact};
use crate::error::{CacheError, LoaderError};
use crate::index::{CacheIndex, IndexRecord};
use crate::lru;

/// Diagnostic snapshot of a single entry.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    /// The entry's cache key.
    pub key: String,
    /// The artifact category.
    pub kind: ArtifactKind,
    /// Measured payload size at insertion time.
    pub size_bytes: u64,
    /// When the entry was last retrieved.
    pub last_accessed_at: SystemTime,
    /// Whether a live payload backs the entry (false for entries
    /// rehydrated from a previous session's index).
    pub resident: bool,
    /// Number of successful retrievals.
    pub access_count: u64,
}

/// Cache statistics: cumulative counters since process start plus
/// current state.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Number of entries, including non-resident rehydrated ones.
    pub entry_count: usize,
    /// Total resident bytes.
    pub total_bytes: u64,
    /// The configured limit.
    pub limit: CacheLimit,
    /// Successful retrievals since process start.
    pub hit_count: u64,
    /// Failed lookups and fresh loads since process start.
    pub miss_count: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            CacheLimit::Bounded(limit) => {
                let pct = if limit > 0 {
                    self.total_bytes as f64 / limit as f64 * 100.0
                } else {
                    0.0
                };
                write!(
                    f,
                    "Models: {}, Size: {}/{} ({pct:.1}%)",
                    self.entry_count,
                    format_bytes(self.total_bytes),
                    format_bytes(limit),
                )
            }
            CacheLimit::Unlimited => write!(
                f,
                "Models: {}, Size: {} (Unlimited)",
                self.entry_count,
                format_bytes(self.total_bytes),
            ),
        }
    }
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    capacity: CapacityTracker,
    /// Keys whose loader is currently running outside the lock.
    in_flight: HashSet<String>,
    next_seq: u64,
    hit_count: u64,
    miss_count: u64,
}

impl CacheState {
    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Retrieves a resident entry's handle, recording the access.
    fn touch_entry(&mut self, key: &str) -> Option<ArtifactHandle> {
        let seq = self.next_seq;
        let entry = self.entries.get_mut(key)?;
        if !entry.payload.is_resident() {
            return None;
        }
        entry.touch(seq);
        let handle = entry.payload.clone();
        self.next_seq = seq + 1;
        Some(handle)
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.capacity.release(entry.resident_bytes());
        Some(entry)
    }
}

/// Process-wide device-memory cache for model artifacts.
///
/// All mutating operations run under a single mutex guarding the entry
/// table, capacity counter, and statistics. `get_or_load` additionally
/// guarantees at most one in-flight load per key: concurrent callers for
/// the same missing key wait for the first load to finish and then
/// observe it as a hit.
pub struct ModelCache {
    state: Mutex<CacheState>,
    load_done: Condvar,
    index_path: PathBuf,
    admission: AdmissionPolicy,
    probe: Option<Box<dyn DeviceMemoryProbe>>,
}

impl ModelCache {
    /// Creates a cache from configuration, rehydrating entry metadata
    /// from a previous session's index when one is present.
    ///
    /// Rehydrated entries are vacant: their payloads did not survive the
    /// previous process, so they occupy no capacity and are reloaded on
    /// first use. An unreadable index is tolerated and logged; the cache
    /// starts empty.
    pub fn new(config: &CacheConfig) -> Self {
        let index_path = config.index_path();
        let mut entries = HashMap::new();
        let mut next_seq = 1u64;

        if let Some(index) = CacheIndex::load(&index_path) {
            // Records are saved most recently used first; reassign the
            // touch sequence so that order carries over.
            let count = index.entries.len() as u64;
            for (i, rec) in index.entries.into_iter().enumerate() {
                let entry = CacheEntry {
                    key: rec.key.clone(),
                    payload: ArtifactHandle::vacant(rec.kind),
                    size_bytes: rec.size_bytes,
                    created_at: rec.created_at,
                    last_accessed_at: rec.last_accessed_at,
                    access_count: rec.access_count,
                    touch_seq: count - i as u64,
                    source: rec.source,
                };
                entries.insert(rec.key, entry);
            }
            next_seq = count + 1;
            debug!(entries = entries.len(), "rehydrated cache index");
        } else if index_path.exists() {
            warn!(
                path = %index_path.display(),
                "cache index unreadable; starting empty"
            );
        }

        Self {
            state: Mutex::new(CacheState {
                entries,
                capacity: CapacityTracker::new(config.limit()),
                in_flight: HashSet::new(),
                next_seq,
                hit_count: 0,
                miss_count: 0,
            }),
            load_done: Condvar::new(),
            index_path,
            admission: config.admission,
            probe: None,
        }
    }

    /// Attaches a device-memory probe for diagnostics.
    pub fn with_probe(mut self, probe: Box<dyn DeviceMemoryProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Returns the cached payload for `key`, or loads it.
    ///
    /// On a hit the entry's access time is updated and `was_cached` is
    /// true. On a miss the loader runs outside the lock (at most one per
    /// key at a time; other callers for the same key wait and then hit),
    /// and the result is inserted subject to capacity and eviction.
    /// Loader failures propagate as [`CacheError::Load`] and nothing is
    /// cached.
    pub fn get_or_load<F>(&self, key: &str, loader: F) -> Result<(ArtifactHandle, bool), CacheError>
    where
        F: FnOnce() -> Result<LoadedArtifact, LoaderError>,
    {
        let mut state = self.lock_state();
        loop {
            if let Some(handle) = state.touch_entry(key) {
                state.hit_count += 1;
                debug!(key, "cache hit");
                return Ok((handle, true));
            }
            if !state.in_flight.contains(key) {
                break;
            }
            state = self
                .load_done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.miss_count += 1;
        state.in_flight.insert(key.to_string());
        drop(state);

        let result = loader();

        let mut state = self.lock_state();
        state.in_flight.remove(key);
        let outcome = match result {
            Ok(loaded) => self
                .insert_locked(&mut state, key, loaded)
                .map(|handle| (handle, false)),
            Err(source) => Err(CacheError::Load {
                key: key.to_string(),
                source,
            }),
        };
        self.load_done.notify_all();
        if outcome.is_ok() {
            self.persist_locked(&state);
        }
        outcome
    }

    /// Inserts an already-loaded artifact under `key`.
    ///
    /// If the key exists and `force` is false, the existing entry is
    /// returned unchanged with `was_cached` true. With `force` the old
    /// payload is released and replaced.
    pub fn put(
        &self,
        key: &str,
        artifact: LoadedArtifact,
        force: bool,
    ) -> Result<(ArtifactHandle, bool), CacheError> {
        let mut state = self.lock_state();
        if !force {
            if let Some(handle) = state.touch_entry(key) {
                state.hit_count += 1;
                return Ok((handle, true));
            }
        }
        let handle = self.insert_locked(&mut state, key, artifact)?;
        self.persist_locked(&state);
        Ok((handle, false))
    }

    /// Pure lookup without loading.
    ///
    /// Updates the entry's access time on success. Fails with
    /// [`CacheError::NotFound`] when the key is absent (or only present
    /// as rehydrated metadata), signaling the caller to fall back to a
    /// load path.
    pub fn get(&self, key: &str) -> Result<ArtifactHandle, CacheError> {
        let mut state = self.lock_state();
        match state.touch_entry(key) {
            Some(handle) => {
                state.hit_count += 1;
                Ok(handle)
            }
            None => {
                state.miss_count += 1;
                Err(CacheError::NotFound {
                    key: key.to_string(),
                })
            }
        }
    }

    /// Whether a resident payload is cached under `key`.
    ///
    /// Does not update LRU order, so status queries never perturb
    /// eviction behavior.
    pub fn contains(&self, key: &str) -> bool {
        let state = self.lock_state();
        state
            .entries
            .get(key)
            .is_some_and(|e| e.payload.is_resident())
    }

    /// Removes one entry and releases its payload. No-op if absent.
    pub fn evict(&self, key: &str) {
        let mut state = self.lock_state();
        if let Some(entry) = state.remove_entry(key) {
            info!(key, freed = entry.resident_bytes(), "evicted entry");
            self.persist_locked(&state);
        }
    }

    /// Removes every entry, releasing all payloads and resetting usage
    /// accounting to zero.
    pub fn clear(&self) {
        let mut state = self.lock_state();
        let keys: Vec<String> = state.entries.keys().cloned().collect();
        for key in keys {
            state.remove_entry(&key);
        }
        info!("cache cleared");
        self.persist_locked(&state);
    }

    /// Replaces the cache limit.
    ///
    /// Lowering the limit below current usage evicts nothing
    /// immediately; eviction happens on the next insertion that needs
    /// space.
    pub fn set_limit(&self, limit: CacheLimit) {
        let mut state = self.lock_state();
        state.capacity.set_limit(limit);
        info!(%limit, "cache limit changed");
        self.persist_locked(&state);
    }

    /// Snapshot of all entries, most recently used first.
    pub fn list_entries(&self) -> Vec<EntryInfo> {
        let state = self.lock_state();
        let mut entries: Vec<&CacheEntry> = state.entries.values().collect();
        entries.sort_by(|a, b| b.touch_seq.cmp(&a.touch_seq));
        entries
            .into_iter()
            .map(|e| EntryInfo {
                key: e.key.clone(),
                kind: e.kind(),
                size_bytes: e.size_bytes,
                last_accessed_at: e.last_accessed_at,
                resident: e.payload.is_resident(),
                access_count: e.access_count,
            })
            .collect()
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock_state();
        CacheStats {
            entry_count: state.entries.len(),
            total_bytes: state.capacity.current_usage(),
            limit: state.capacity.limit(),
            hit_count: state.hit_count,
            miss_count: state.miss_count,
        }
    }

    /// Device-memory figures from the attached probe, if any.
    pub fn device_memory(&self) -> Option<DeviceMemoryReport> {
        self.probe.as_ref().map(|p| p.report())
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts under the lock, evicting least recently used entries as
    /// needed to satisfy capacity.
    fn insert_locked(
        &self,
        state: &mut CacheState,
        key: &str,
        loaded: LoadedArtifact,
    ) -> Result<ArtifactHandle, CacheError> {
        let size_bytes = loaded.size_bytes;

        if let CacheLimit::Bounded(limit) = state.capacity.limit() {
            if self.admission == AdmissionPolicy::Strict && size_bytes > limit {
                return Err(CacheError::Capacity {
                    size_bytes,
                    limit_bytes: limit,
                });
            }
        }

        // Replacing an existing key releases the old payload first.
        state.remove_entry(key);

        if !state.capacity.would_fit(size_bytes, state.entries.is_empty()) {
            if let CacheLimit::Bounded(limit) = state.capacity.limit() {
                let needed = state
                    .capacity
                    .current_usage()
                    .saturating_add(size_bytes)
                    .saturating_sub(limit);
                for victim in lru::select_victims(needed, &state.entries) {
                    if let Some(entry) = state.remove_entry(&victim) {
                        info!(
                            key = victim.as_str(),
                            freed = entry.resident_bytes(),
                            "evicted least recently used entry"
                        );
                    }
                }
            }
        }

        let seq = state.bump_seq();
        let now = SystemTime::now();
        let handle = loaded.payload.clone();
        let reserve = if handle.is_resident() { size_bytes } else { 0 };
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                payload: loaded.payload,
                size_bytes,
                created_at: now,
                last_accessed_at: now,
                access_count: 0,
                touch_seq: seq,
                source: loaded.source,
            },
        );
        state.capacity.reserve(reserve);
        debug!(key, size = size_bytes, "inserted artifact");
        Ok(handle)
    }

    /// Writes the metadata index, tolerating and logging failures.
    /// Persistence is best-effort; it never fails a cache operation.
    fn persist_locked(&self, state: &CacheState) {
        let mut entries: Vec<&CacheEntry> = state.entries.values().collect();
        entries.sort_by(|a, b| b.touch_seq.cmp(&a.touch_seq));
        let index = CacheIndex::new(entries.into_iter().map(IndexRecord::from_entry).collect());
        if let Err(e) = index.save(&self.index_path) {
            warn!(error = %e, "failed to persist cache index");
        }
    }
}

//! Capacity accounting for the device-memory cache.

use serde::{Deserialize, Serialize};
use std::fmt;

use vramkeep_common::format_bytes;

/// The configured cache ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheLimit {
    /// Total resident bytes must stay at or below this ceiling.
    Bounded(u64),
    /// No ceiling; capacity never triggers eviction.
    Unlimited,
}

impl fmt::Display for CacheLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(bytes) => f.write_str(&format_bytes(*bytes)),
            Self::Unlimited => f.write_str("Unlimited"),
        }
    }
}

/// Tracks total occupied bytes against the configured limit.
///
/// Pure bookkeeping: the tracker never evicts anything itself. The
/// insertion path consults [`would_fit`](CapacityTracker::would_fit) and
/// runs eviction before reserving.
#[derive(Debug, Clone)]
pub struct CapacityTracker {
    limit: CacheLimit,
    used: u64,
}

impl CapacityTracker {
    /// Creates a tracker with the given limit and zero usage.
    pub fn new(limit: CacheLimit) -> Self {
        Self { limit, used: 0 }
    }

    /// Whether `additional_bytes` can be admitted right now.
    ///
    /// In unlimited mode this is always true. In bounded mode the sum of
    /// usage and the addition must stay within the limit, with one
    /// deliberate exception: an empty store admits a single artifact of
    /// any size. Rejecting an artifact that alone exceeds the limit would
    /// make that artifact permanently uncacheable, so the lenient policy
    /// admits it rather than leave the cache unusable for it.
    pub fn would_fit(&self, additional_bytes: u64, store_empty: bool) -> bool {
        match self.limit {
            CacheLimit::Unlimited => true,
            CacheLimit::Bounded(limit) => {
                store_empty || self.used.saturating_add(additional_bytes) <= limit
            }
        }
    }

    /// Records `bytes` as occupied.
    pub fn reserve(&mut self, bytes: u64) {
        self.used = self.used.saturating_add(bytes);
    }

    /// Records `bytes` as freed.
    pub fn release(&mut self, bytes: u64) {
        self.used = self.used.saturating_sub(bytes);
    }

    /// Current total occupied bytes.
    pub fn current_usage(&self) -> u64 {
        self.used
    }

    /// The configured limit.
    pub fn limit(&self) -> CacheLimit {
        self.limit
    }

    /// Replaces the limit.
    ///
    /// Lowering the limit below current usage does not evict anything;
    /// eviction happens on the next insertion that needs space.
    pub fn set_limit(&mut self, limit: CacheLimit) {
        self.limit = limit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_always_fits() {
        let mut t = CapacityTracker::new(CacheLimit::Unlimited);
        t.reserve(u64::MAX / 2);
        assert!(t.would_fit(u64::MAX / 2, false));
    }

    #[test]
    fn bounded_fits_within_limit() {
        let mut t = CapacityTracker::new(CacheLimit::Bounded(100));
        t.reserve(60);
        assert!(t.would_fit(40, false));
        assert!(!t.would_fit(41, false));
    }

    #[test]
    fn empty_store_admits_oversized() {
        let t = CapacityTracker::new(CacheLimit::Bounded(100));
        assert!(t.would_fit(500, true));
        assert!(!t.would_fit(500, false));
    }

    #[test]
    fn reserve_and_release_roundtrip() {
        let mut t = CapacityTracker::new(CacheLimit::Bounded(100));
        t.reserve(70);
        assert_eq!(t.current_usage(), 70);
        t.release(30);
        assert_eq!(t.current_usage(), 40);
    }

    #[test]
    fn release_saturates_at_zero() {
        let mut t = CapacityTracker::new(CacheLimit::Bounded(100));
        t.reserve(10);
        t.release(50);
        assert_eq!(t.current_usage(), 0);
    }

    #[test]
    fn lowering_limit_keeps_usage() {
        let mut t = CapacityTracker::new(CacheLimit::Bounded(100));
        t.reserve(80);
        t.set_limit(CacheLimit::Bounded(50));
        assert_eq!(t.current_usage(), 80);
        assert!(!t.would_fit(1, false));
    }

    #[test]
    fn limit_display() {
        assert_eq!(CacheLimit::Unlimited.to_string(), "Unlimited");
        assert_eq!(
            CacheLimit::Bounded(8 * 1024 * 1024 * 1024).to_string(),
            "8.0 GiB"
        );
    }
}

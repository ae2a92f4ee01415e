//! Read-only device-memory diagnostics.
//!
//! The cache never queries the device directly; the host integration
//! supplies a probe and the manager exposes its figures alongside cache
//! statistics.

/// Point-in-time device-memory figures, all in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMemoryReport {
    /// Total device memory.
    pub total: u64,
    /// Bytes currently allocated.
    pub allocated: u64,
    /// Bytes reserved by the allocator but not allocated.
    pub reserved: u64,
    /// Bytes free.
    pub free: u64,
}

/// Collaborator that reports device-memory figures.
///
/// Implemented by the host integration over whatever device API it uses;
/// the cache treats it as an opaque queryable service.
pub trait DeviceMemoryProbe: Send + Sync {
    /// Returns current device-memory figures.
    fn report(&self) -> DeviceMemoryReport;
}

//! Error types for cache operations.

use std::path::PathBuf;

/// Boxed error type produced by loader collaborators.
///
/// The loader performs the actual disk read and device transfer, so its
/// failures are arbitrary; they are carried unmodified as the source of
/// [`CacheError::Load`].
pub type LoaderError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during cache operations.
///
/// Metadata persistence failures are recovered from internally (logged,
/// never surfaced); every other failure is returned to the caller so the
/// host integration can present a clear status to its user.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No cache identity could be derived: the source path does not exist
    /// (or cannot be inspected) and no explicit name was given.
    #[error("invalid artifact source {path}: {source}")]
    InvalidSource {
        /// The path that could not be resolved.
        path: PathBuf,
        /// The underlying I/O error from inspecting the path.
        source: std::io::Error,
    },

    /// The requested key is not resident in the cache.
    ///
    /// Signals the caller to fall back to a load path; it is not a fault.
    #[error("no cached artifact for key {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// A loader collaborator failed while reading or transferring an
    /// artifact. The original failure is preserved as the source.
    #[error("artifact load failed for key {key}: {source}")]
    Load {
        /// The key whose load failed.
        key: String,
        /// The loader's own error, propagated unmodified.
        source: LoaderError,
    },

    /// An artifact was rejected under the strict admission policy because
    /// it is larger than the configured cache limit on its own.
    #[error("artifact of {size_bytes} bytes exceeds cache limit of {limit_bytes} bytes")]
    Capacity {
        /// Size of the rejected artifact.
        size_bytes: u64,
        /// The configured cache ceiling.
        limit_bytes: u64,
    },

    /// An I/O error occurred while reading or writing the metadata index.
    #[error("cache index I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_source_display() {
        let err = CacheError::InvalidSource {
            path: PathBuf::from("/models/missing.safetensors"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid artifact source"));
        assert!(msg.contains("missing.safetensors"));
    }

    #[test]
    fn not_found_display() {
        let err = CacheError::NotFound {
            key: "sdxl-base".to_string(),
        };
        assert!(err.to_string().contains("sdxl-base"));
    }

    #[test]
    fn load_error_preserves_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated file");
        let err = CacheError::Load {
            key: "abc123".to_string(),
            source: Box::new(inner),
        };
        let msg = err.to_string();
        assert!(msg.contains("artifact load failed"));
        assert!(msg.contains("truncated file"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn capacity_display() {
        let err = CacheError::Capacity {
            size_bytes: 12_000,
            limit_bytes: 10_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("12000"));
        assert!(msg.contains("10000"));
    }

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/vram_cache/cache_index.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache index I/O error"));
        assert!(msg.contains("cache_index.json"));
    }

    #[test]
    fn serialization_display() {
        let err = CacheError::Serialization {
            reason: "unexpected EOF".to_string(),
        };
        assert!(err.to_string().contains("unexpected EOF"));
    }
}

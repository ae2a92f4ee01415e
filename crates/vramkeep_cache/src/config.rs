//! Cache configuration, deserialized from TOML.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::capacity::CacheLimit;
use crate::error::CacheError;
use crate::index::INDEX_FILE;

/// Default cache ceiling: 8 GiB.
const DEFAULT_MAX_SIZE_GB: f64 = 8.0;

/// Admission rule for an artifact larger than the configured limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionPolicy {
    /// Admit the artifact alone into an empty store (after evicting
    /// everything else). The default.
    #[default]
    Lenient,
    /// Reject the artifact with [`CacheError::Capacity`].
    ///
    /// [`CacheError::Capacity`]: crate::error::CacheError::Capacity
    Strict,
}

/// Cache manager configuration.
///
/// Every field has a default, so an absent or empty config file yields a
/// usable cache: 8 GiB bounded, lenient admission, index under the
/// system temp directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum total resident size in gibibytes. Ignored when
    /// `unlimited` is set.
    pub max_size_gb: f64,
    /// Disables the size ceiling entirely.
    pub unlimited: bool,
    /// Directory holding the metadata index. Defaults to
    /// `<system temp>/vram_cache`.
    pub cache_dir: Option<PathBuf>,
    /// What to do with an artifact larger than the limit on its own.
    pub admission: AdmissionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_gb: DEFAULT_MAX_SIZE_GB,
            unlimited: false,
            cache_dir: None,
            admission: AdmissionPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, CacheError> {
        toml::from_str(text).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })
    }

    /// Reads and parses a configuration file.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let text = std::fs::read_to_string(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&text)
    }

    /// The effective cache limit.
    pub fn limit(&self) -> CacheLimit {
        if self.unlimited {
            CacheLimit::Unlimited
        } else {
            CacheLimit::Bounded((self.max_size_gb * (1u64 << 30) as f64) as u64)
        }
    }

    /// The directory holding the metadata index.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("vram_cache"))
    }

    /// Full path of the metadata index file.
    pub fn index_path(&self) -> PathBuf {
        self.cache_dir().join(INDEX_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded_8gib() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.limit(), CacheLimit::Bounded(8 * 1024 * 1024 * 1024));
        assert_eq!(cfg.admission, AdmissionPolicy::Lenient);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg = CacheConfig::from_toml("").unwrap();
        assert_eq!(cfg.limit(), CacheLimit::Bounded(8 * 1024 * 1024 * 1024));
    }

    #[test]
    fn unlimited_beats_max_size() {
        let cfg = CacheConfig::from_toml("unlimited = true\nmax_size_gb = 4.0").unwrap();
        assert_eq!(cfg.limit(), CacheLimit::Unlimited);
    }

    #[test]
    fn fractional_limit() {
        let cfg = CacheConfig::from_toml("max_size_gb = 0.5").unwrap();
        assert_eq!(cfg.limit(), CacheLimit::Bounded(512 * 1024 * 1024));
    }

    #[test]
    fn strict_admission_parses() {
        let cfg = CacheConfig::from_toml("admission = \"strict\"").unwrap();
        assert_eq!(cfg.admission, AdmissionPolicy::Strict);
    }

    #[test]
    fn explicit_cache_dir() {
        let cfg = CacheConfig::from_toml("cache_dir = \"/var/cache/models\"").unwrap();
        assert_eq!(
            cfg.index_path(),
            PathBuf::from("/var/cache/models/cache_index.json")
        );
    }

    #[test]
    fn default_cache_dir_under_temp() {
        let cfg = CacheConfig::default();
        assert!(cfg.cache_dir().ends_with("vram_cache"));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = CacheConfig::from_toml("max_size_gb = \"lots\"").unwrap_err();
        assert!(matches!(err, CacheError::Serialization { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vramkeep.toml");
        std::fs::write(&path, "max_size_gb = 2.0").unwrap();
        let cfg = CacheConfig::load(&path).unwrap();
        assert_eq!(cfg.limit(), CacheLimit::Bounded(2 * 1024 * 1024 * 1024));
    }

    #[test]
    fn load_missing_file_errors() {
        let err = CacheConfig::load(Path::new("/nonexistent/vramkeep.toml")).unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
    }
}

//! Cache key derivation for model artifacts.
//!
//! Keys come in two modes. Name-keyed mode uses a caller-assigned logical
//! name verbatim, so an artifact can be retrieved later without ever
//! re-presenting its source. Fingerprint mode derives the key from the
//! source file's canonical path, modification time, and size, so any
//! change to the file (or its location) yields a different key.

use std::path::Path;
use std::time::UNIX_EPOCH;

use vramkeep_common::Fingerprint;

use crate::entry::SourceDescriptor;
use crate::error::CacheError;

/// Derives a cache key for an artifact.
///
/// If `explicit_name` is non-empty the key is exactly that name and the
/// source path (if any) is only used to capture a [`SourceDescriptor`].
/// Otherwise the key is the hex form of an XXH3-128 fingerprint over
/// `canonical_path:mtime_nanos:size`, and deriving it requires the path
/// to exist.
///
/// Returns the key together with the source descriptor captured while
/// inspecting the path, so callers insert exactly what was fingerprinted.
pub fn resolve_key(
    source_path: Option<&Path>,
    explicit_name: Option<&str>,
) -> Result<(String, Option<SourceDescriptor>), CacheError> {
    match explicit_name {
        Some(name) if !name.is_empty() => {
            let descriptor = source_path.and_then(|p| probe_source(p).ok());
            Ok((name.to_string(), descriptor))
        }
        _ => {
            let path = source_path.ok_or_else(|| CacheError::InvalidSource {
                path: Path::new("").to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "no source path and no explicit name",
                ),
            })?;
            let descriptor = probe_source(path)?;
            let key = fingerprint(&descriptor).to_hex();
            Ok((key, Some(descriptor)))
        }
    }
}

/// Inspects a source file and captures its identity-relevant metadata.
pub fn probe_source(path: &Path) -> Result<SourceDescriptor, CacheError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| CacheError::InvalidSource {
            path: path.to_path_buf(),
            source: e,
        })?;
    let meta = std::fs::metadata(&canonical).map_err(|e| CacheError::InvalidSource {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mtime = meta.modified().map_err(|e| CacheError::InvalidSource {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(SourceDescriptor {
        path: canonical,
        mtime,
        size_bytes: meta.len(),
    })
}

/// Computes the content fingerprint for a source descriptor.
fn fingerprint(descriptor: &SourceDescriptor) -> Fingerprint {
    let mtime_nanos = descriptor
        .mtime
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let input = format!(
        "{}:{}:{}",
        descriptor.path.display(),
        mtime_nanos,
        descriptor.size_bytes
    );
    Fingerprint::of(input.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn explicit_name_wins() {
        let (key, descriptor) = resolve_key(None, Some("my-checkpoint")).unwrap();
        assert_eq!(key, "my-checkpoint");
        assert!(descriptor.is_none());
    }

    #[test]
    fn explicit_name_with_missing_path_still_resolves() {
        let (key, descriptor) =
            resolve_key(Some(Path::new("/nonexistent/model.safetensors")), Some("n")).unwrap();
        assert_eq!(key, "n");
        assert!(descriptor.is_none());
    }

    #[test]
    fn empty_name_falls_back_to_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        fs::write(&path, b"weights").unwrap();

        let (key, descriptor) = resolve_key(Some(&path), Some("")).unwrap();
        assert_eq!(key.len(), 32);
        assert!(descriptor.is_some());
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        fs::write(&path, b"weights").unwrap();

        let (k1, _) = resolve_key(Some(&path), None).unwrap();
        let (k2, _) = resolve_key(Some(&path), None).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn size_change_changes_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        fs::write(&path, b"weights").unwrap();
        let (k1, _) = resolve_key(Some(&path), None).unwrap();

        fs::write(&path, b"longer weights than before").unwrap();
        let (k2, _) = resolve_key(Some(&path), None).unwrap();
        assert_ne!(k1, k2);
    }

    #[test]
    fn different_paths_differ() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a.safetensors");
        let path_b = dir.path().join("b.safetensors");
        fs::write(&path_a, b"weights").unwrap();
        fs::write(&path_b, b"weights").unwrap();

        let (ka, _) = resolve_key(Some(&path_a), None).unwrap();
        let (kb, _) = resolve_key(Some(&path_b), None).unwrap();
        assert_ne!(ka, kb);
    }

    #[test]
    fn missing_path_without_name_errors() {
        let err = resolve_key(Some(Path::new("/nonexistent/model.safetensors")), None)
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidSource { .. }));
    }

    #[test]
    fn no_path_no_name_errors() {
        let err = resolve_key(None, None).unwrap_err();
        assert!(matches!(err, CacheError::InvalidSource { .. }));
    }

    #[test]
    fn descriptor_captures_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        fs::write(&path, b"0123456789").unwrap();

        let (_, descriptor) = resolve_key(Some(&path), None).unwrap();
        assert_eq!(descriptor.unwrap().size_bytes, 10);
    }
}

//! Artifact caching.
//!
//! Build outputs are addressed by a content key and stored as single blobs.
//! [`dir::DirArtifactCache`] is the directory-backed backend;
//! [`multi::MultiArtifactCache`] composes an ordered sequence of backends
//! with fallback and backfill. The composition implements the same
//! [`ArtifactCache`] contract it consumes, so caches nest.

pub mod dir;
pub mod multi;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from artifact cache I/O. Always propagated, never swallowed.
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("artifact cache i/o error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Content/identity key addressing one cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
  pub fn new(key: impl Into<String>) -> Self {
    Self(key.into())
  }

  /// Key derived from raw content.
  pub fn for_bytes(bytes: &[u8]) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Self(hex::encode(hasher.finalize()))
  }

  /// Key derived from a file's content.
  pub fn for_file(path: &Path) -> Result<Self, CacheError> {
    let bytes = std::fs::read(path).map_err(|source| CacheError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Ok(Self::for_bytes(&bytes))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A key/blob store holding one artifact per key.
pub trait ArtifactCache: Send + Sync {
  /// Look the key up; on a hit, write the artifact to `output` and return
  /// true. A miss returns false and leaves `output` untouched.
  fn fetch(&self, key: &CacheKey, output: &Path) -> Result<bool, CacheError>;

  /// Store the artifact at `artifact` under the key, unconditionally.
  fn store(&self, key: &CacheKey, artifact: &Path) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn key_is_stable_for_identical_content() {
    assert_eq!(CacheKey::for_bytes(b"artifact"), CacheKey::for_bytes(b"artifact"));
    assert_ne!(CacheKey::for_bytes(b"artifact"), CacheKey::for_bytes(b"other"));
  }

  #[test]
  fn file_key_matches_content_key() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("blob");
    std::fs::write(&path, b"artifact").unwrap();

    assert_eq!(CacheKey::for_file(&path).unwrap(), CacheKey::for_bytes(b"artifact"));
  }

  #[test]
  fn missing_file_key_is_io_error() {
    let err = CacheKey::for_file(Path::new("/does/not/exist")).unwrap_err();
    assert!(matches!(err, CacheError::Io { .. }));
  }
}

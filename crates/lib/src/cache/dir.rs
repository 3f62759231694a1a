//! Directory-backed artifact cache.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::trace;

use super::{ArtifactCache, CacheError, CacheKey};

/// Stores one file per key under a root directory, fanned out by key prefix.
pub struct DirArtifactCache {
  root: PathBuf,
}

impl DirArtifactCache {
  pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
    let root = root.into();
    fs::create_dir_all(&root).map_err(|source| CacheError::Io {
      path: root.clone(),
      source,
    })?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn entry_path(&self, key: &CacheKey) -> PathBuf {
    let key = key.as_str();
    // Two-character fan-out keeps directories small; short keys go flat.
    match key.char_indices().nth(2) {
      Some((split, _)) => self.root.join(&key[..split]).join(key),
      None => self.root.join(key),
    }
  }
}

impl ArtifactCache for DirArtifactCache {
  fn fetch(&self, key: &CacheKey, output: &Path) -> Result<bool, CacheError> {
    let entry = self.entry_path(key);
    if !entry.is_file() {
      return Ok(false);
    }

    fs::copy(&entry, output).map_err(|source| CacheError::Io {
      path: output.to_path_buf(),
      source,
    })?;
    trace!(key = %key, cache = %self.root.display(), "artifact cache hit");
    Ok(true)
  }

  fn store(&self, key: &CacheKey, artifact: &Path) -> Result<(), CacheError> {
    let entry = self.entry_path(key);
    if let Some(parent) = entry.parent() {
      fs::create_dir_all(parent).map_err(|source| CacheError::Io {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    // Write-then-rename so readers never observe a partial artifact.
    let temp = NamedTempFile::new_in(&self.root).map_err(|source| CacheError::Io {
      path: self.root.clone(),
      source,
    })?;
    fs::copy(artifact, temp.path()).map_err(|source| CacheError::Io {
      path: artifact.to_path_buf(),
      source,
    })?;
    temp.persist(&entry).map_err(|err| CacheError::Io {
      path: entry.clone(),
      source: err.error,
    })?;

    trace!(key = %key, cache = %self.root.display(), "artifact stored");
    Ok(())
  }
}

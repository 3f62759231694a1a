//! Ordered composition of artifact cache backends.

use std::path::Path;

use tracing::debug;

use super::{ArtifactCache, CacheError, CacheKey};

/// Composes backends so that `fetch` succeeds if any backend holds the
/// artifact and `store` applies to all of them.
///
/// Backends are probed strictly in configured order; ordering them from
/// fastest to slowest makes the backfill a cache-warming step, since the
/// next fetch for the same key hits an earlier backend. "Probed before the
/// hit" is decided by position in the configured sequence, so an instance
/// appearing twice is probed and backfilled at each of its positions
/// independently; the list is never deduplicated.
pub struct MultiArtifactCache {
  caches: Vec<Box<dyn ArtifactCache>>,
}

impl MultiArtifactCache {
  pub fn new(caches: Vec<Box<dyn ArtifactCache>>) -> Self {
    Self { caches }
  }

  pub fn len(&self) -> usize {
    self.caches.len()
  }

  pub fn is_empty(&self) -> bool {
    self.caches.is_empty()
  }
}

impl ArtifactCache for MultiArtifactCache {
  /// Probe backends in order. On the first hit, write the artifact to
  /// `output`, then backfill every backend probed before the hit (in probe
  /// order) so later fetches terminate earlier. A miss everywhere returns
  /// false and modifies nothing.
  fn fetch(&self, key: &CacheKey, output: &Path) -> Result<bool, CacheError> {
    for (hit_index, cache) in self.caches.iter().enumerate() {
      if cache.fetch(key, output)? {
        debug!(key = %key, backend = hit_index, "artifact cache hit");
        for earlier in &self.caches[..hit_index] {
          earlier.store(key, output)?;
        }
        return Ok(true);
      }
    }

    debug!(key = %key, "artifact cache miss");
    Ok(false)
  }

  /// Store the artifact to every backend, in order, regardless of which of
  /// them already hold the key.
  fn store(&self, key: &CacheKey, artifact: &Path) -> Result<(), CacheError> {
    for cache in &self.caches {
      cache.store(key, artifact)?;
    }
    Ok(())
  }
}

//! Parsed-manifest cache.
//!
//! A cached parse is reused only while the file's mtime is unchanged.
//! Edits landing inside one mtime granularity unit are invisible to that
//! check, which is why reloads clear the cache instead of relying on it.
//!
//! Within one resolution pass the cache still saves work: overlapping
//! identifiers (`orders` and `orders.processor:OrderWorker`) read each
//! manifest once. Across passes only non-forced resolutions reuse entries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use rustc_hash::FxHashMap;

use super::ResolveError;
use super::manifest::Manifest;
use crate::freshness::get_mtime;

struct CachedManifest {
    mtime: SystemTime,
    manifest: Arc<Manifest>,
}

/// Manifest cache keyed by normalized path.
#[derive(Default)]
pub struct ManifestCache {
    entries: FxHashMap<PathBuf, CachedManifest>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached manifest for `path`, parsing it if absent or stale.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Manifest>, ResolveError> {
        let mtime = get_mtime(path);

        if let (Some(mtime), Some(cached)) = (mtime, self.entries.get(path))
            && cached.mtime == mtime
        {
            return Ok(Arc::clone(&cached.manifest));
        }

        let manifest = Arc::new(Manifest::load(path)?);
        match mtime {
            Some(mtime) => {
                self.entries.insert(
                    path.to_path_buf(),
                    CachedManifest {
                        mtime,
                        manifest: Arc::clone(&manifest),
                    },
                );
            }
            None => {
                self.entries.remove(path);
            }
        }
        Ok(manifest)
    }

    /// Drop every cached parse so the next `load` reads from disk.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

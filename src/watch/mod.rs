//! Change detection by mtime polling.
//!
//! The watcher owns one `WatchEntry` per watched path and compares the
//! on-disk mtime against it on every `poll()`. Package directories are
//! compared by their manifest listing instead, so hidden files, editor swap
//! files and other non-manifests never count as a change. Reported changes stay
//! reported until the owner calls `baseline()` again, so a reload that
//! fails never loses the change that triggered it.
//!
//! ```text
//! baseline(paths) ──► poll() ──► [changed paths] ──► (reload) ──► baseline(paths')
//!                       ▲  │ empty
//!                       └──┘
//! ```

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rustc_hash::FxHashSet;

use crate::freshness::{ContentHash, compute_file_hash, get_mtime};
use crate::resolve::package_members;

/// Last observed state of one watched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub path: PathBuf,
    /// `None` when the path did not exist at observation time
    pub mtime: Option<SystemTime>,
    /// Only recorded for files when content hashing is enabled
    pub hash: Option<ContentHash>,
    /// Manifest listing, for paths that were directories at observation time
    pub members: Option<Vec<PathBuf>>,
}

impl WatchEntry {
    fn observe(path: PathBuf, content_hash: bool) -> Self {
        let mtime = get_mtime(&path);
        let hash = if content_hash && path.is_file() {
            compute_file_hash(&path)
        } else {
            None
        };
        let members = list_members(&path);
        Self {
            path,
            mtime,
            hash,
            members,
        }
    }
}

/// `None` when `path` is not a directory (any more).
fn list_members(path: &Path) -> Option<Vec<PathBuf>> {
    if !path.is_dir() {
        return None;
    }
    Some(package_members(path).unwrap_or_default())
}

/// Polls a fixed set of paths for modification.
pub struct ChangeWatcher {
    entries: Vec<WatchEntry>,
    content_hash: bool,
}

impl ChangeWatcher {
    /// `content_hash`: ignore mtime moves that leave file content unchanged.
    pub fn new(content_hash: bool) -> Self {
        Self {
            entries: Vec::new(),
            content_hash,
        }
    }

    /// Replace the watch set with `paths`, recording their current state.
    ///
    /// Duplicates are dropped, keeping the first occurrence's position.
    pub fn baseline<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut seen = FxHashSet::default();
        self.entries = paths
            .into_iter()
            .filter(|path| seen.insert(path.clone()))
            .map(|path| WatchEntry::observe(path, self.content_hash))
            .collect();

        crate::debug!("watch"; "baseline: {} path(s)", self.entries.len());
    }

    /// Paths whose mtime differs from the baseline, in baseline order.
    ///
    /// A path that vanished counts as changed. A package directory counts as
    /// changed when a manifest was added or removed. A path that was already
    /// missing at baseline time and is still missing does not. With content
    /// hashing, an mtime move over identical content is absorbed into the
    /// entry and not reported.
    pub fn poll(&mut self) -> Vec<PathBuf> {
        let mut changed = Vec::new();

        for entry in &mut self.entries {
            if let Some(members) = &entry.members {
                if list_members(&entry.path).as_ref() != Some(members) {
                    changed.push(entry.path.clone());
                }
                continue;
            }

            let current = get_mtime(&entry.path);
            if current == entry.mtime {
                continue;
            }

            if let (Some(_), Some(previous)) = (current, entry.hash)
                && compute_file_hash(&entry.path) == Some(previous)
            {
                crate::debug!("watch"; "touched, content unchanged ({}): {}", previous, entry.path.display());
                entry.mtime = current;
                continue;
            }

            changed.push(entry.path.clone());
        }

        changed
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

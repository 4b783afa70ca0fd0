//! Mtime lookup for watched source locations.
//!
//! Detection granularity is whatever the filesystem records. Two edits
//! inside one granularity unit look like a single change.

use std::path::Path;
use std::time::SystemTime;

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read.
/// Callers treat `None` as a distinct state rather than an error, so a
/// deleted manifest compares unequal to its last recorded mtime.
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

//! Freshness detection for watched manifests: mtime first, blake3 on demand.

mod hash;
mod mtime;

pub use hash::{ContentHash, compute_file_hash};
pub use mtime::get_mtime;

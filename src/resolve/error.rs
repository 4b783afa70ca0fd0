//! Resolution errors.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a set of identifiers could not be turned into worker classes.
///
/// Fatal at startup. During a reload the supervisor logs it and keeps
/// polling.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("malformed identifier `{identifier}`: {reason}")]
    Malformed {
        identifier: String,
        reason: &'static str,
    },

    #[error("no module or package named `{identifier}` under `{}`", root.display())]
    NotFound { identifier: String, root: PathBuf },

    #[error("package `{identifier}` contains no manifests (`{}`)", dir.display())]
    EmptyPackage { identifier: String, dir: PathBuf },

    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("manifest parsing error in `{}`", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid worker declaration in `{}`: {reason}", path.display())]
    InvalidWorker { path: PathBuf, reason: String },

    #[error("`{identifier}` does not declare a worker class named `{class}`")]
    UnknownClass { identifier: String, class: String },

    #[error(
        "worker class `{name}` is declared twice (`{}` and `{}`)",
        first.display(),
        second.display()
    )]
    DuplicateClass {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("`{identifier}` declares no worker classes")]
    NoWorkers { identifier: String },
}

impl ResolveError {
    /// The manifest the error points at, when it is about one file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io(path, _) | Self::Parse(path, _) => Some(path.as_path()),
            Self::InvalidWorker { path, .. } => Some(path.as_path()),
            Self::DuplicateClass { second, .. } => Some(second.as_path()),
            _ => None,
        }
    }
}

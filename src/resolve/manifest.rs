//! Worker manifests: the explicit registration contract.
//!
//! Every manifest lists the worker classes it contributes:
//!
//! ```toml
//! [[worker]]
//! name = "OrderWorker"
//! queue = "orders"
//! interval_ms = 500
//! concurrency = 2
//!
//! [worker.options]
//! batch_size = 10
//! ```
//!
//! Nothing is discovered implicitly. A file without `[[worker]]` tables
//! contributes no classes.

use std::path::Path;
use std::time::Duration;

use rustc_hash::FxHashSet;
use serde::Deserialize;

use super::ResolveError;
use super::identifier::is_class_name;

const DEFAULT_INTERVAL_MS: u64 = 1000;

/// A parsed and validated manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub workers: Vec<WorkerDefinition>,
}

/// One declared worker class.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerDefinition {
    pub name: String,
    /// Queue the worker consumes from
    pub queue: String,
    /// Pause between units of work
    pub interval: Duration,
    /// Parallel execution contexts for this class
    pub concurrency: usize,
    /// Free-form settings handed to the runner untouched
    pub options: toml::Table,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default, rename = "worker")]
    workers: Vec<RawWorker>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWorker {
    name: String,
    queue: Option<String>,
    interval_ms: Option<u64>,
    concurrency: Option<usize>,
    #[serde(default)]
    options: toml::Table,
}

impl Manifest {
    /// Read and validate the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ResolveError> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| ResolveError::Io(path.to_path_buf(), err))?;
        Self::parse(&content, path)
    }

    /// Parse manifest content. `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ResolveError> {
        let raw: RawManifest =
            toml::from_str(content).map_err(|err| ResolveError::Parse(path.to_path_buf(), err))?;

        let invalid = |reason: String| ResolveError::InvalidWorker {
            path: path.to_path_buf(),
            reason,
        };

        let mut seen = FxHashSet::default();
        let mut workers = Vec::with_capacity(raw.workers.len());

        for worker in raw.workers {
            if !is_class_name(&worker.name) {
                return Err(invalid(format!(
                    "`{}` is not a valid class name ([A-Za-z0-9_]+)",
                    worker.name
                )));
            }
            if !seen.insert(worker.name.clone()) {
                return Err(invalid(format!("`{}` is declared twice", worker.name)));
            }

            let concurrency = worker.concurrency.unwrap_or(1);
            if concurrency == 0 {
                return Err(invalid(format!("`{}`: concurrency must be >= 1", worker.name)));
            }

            let interval_ms = worker.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS);
            if interval_ms == 0 {
                return Err(invalid(format!("`{}`: interval_ms must be >= 1", worker.name)));
            }

            workers.push(WorkerDefinition {
                queue: worker
                    .queue
                    .unwrap_or_else(|| worker.name.to_ascii_lowercase()),
                name: worker.name,
                interval: Duration::from_millis(interval_ms),
                concurrency,
                options: worker.options,
            });
        }

        Ok(Self { workers })
    }
}

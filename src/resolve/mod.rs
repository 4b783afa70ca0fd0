//! Source resolution: identifiers → manifests → worker classes.
//!
//! ```text
//! "orders"            → <root>/orders.toml            (module)
//!                     → <root>/orders/*.toml          (package, if no module file)
//! "orders.processor"  → <root>/orders/processor.toml
//! "orders:OrderWorker"→ only that class from the module or package
//! ```
//!
//! Output ordering is deterministic: identifiers in the order given, package
//! members sorted by file name, classes in declaration order. Duplicated
//! locations are kept once (first occurrence wins).

mod cache;
mod error;
mod identifier;
mod manifest;


use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::utils::path::{is_temp_file, normalize_path};
use cache::ManifestCache;

pub use error::ResolveError;
pub use identifier::Identifier;
pub use manifest::{Manifest, WorkerDefinition};

/// File extension of worker manifests.
pub const MANIFEST_EXTENSION: &str = "toml";

// ============================================================================
// Resolved types
// ============================================================================

/// Absolute path to one manifest that contributes worker classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLocation(PathBuf);

impl SourceLocation {
    pub fn new(path: &Path) -> Self {
        Self(normalize_path(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A worker class declared by a manifest, ready to be registered with a runner.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerClassRef {
    pub location: SourceLocation,
    pub definition: WorkerDefinition,
}

impl WorkerClassRef {
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

/// Result of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub locations: Vec<SourceLocation>,
    pub classes: Vec<WorkerClassRef>,
    /// Package directories. Watched alongside `locations` so that adding or
    /// removing a member manifest is noticed.
    pub packages: Vec<PathBuf>,
}

impl Resolution {
    /// Every path the watcher should baseline for this resolution.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        self.locations
            .iter()
            .map(|loc| loc.path().to_path_buf())
            .chain(self.packages.iter().cloned())
            .collect()
    }

    /// `"OrderWorker, NotifyWorker"`, for log lines.
    pub fn class_names(&self) -> String {
        class_names(&self.classes)
    }
}

/// Comma-separated class names in registration order.
pub fn class_names(classes: &[WorkerClassRef]) -> String {
    classes
        .iter()
        .map(WorkerClassRef::name)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Resolver
// ============================================================================

enum Target {
    Module(PathBuf),
    Package { dir: PathBuf, members: Vec<PathBuf> },
}

/// Resolves identifiers against a search root, caching parsed manifests.
pub struct SourceResolver {
    root: PathBuf,
    cache: ManifestCache,
}

impl SourceResolver {
    pub fn new(root: &Path) -> Self {
        Self {
            root: normalize_path(root),
            cache: ManifestCache::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve identifiers to locations and worker classes.
    ///
    /// `force_reload` discards every cached parse first, so the result
    /// reflects the files exactly as they are on disk now.
    pub fn resolve(
        &mut self,
        identifiers: &[Identifier],
        force_reload: bool,
    ) -> Result<Resolution, ResolveError> {
        if force_reload {
            self.cache.clear();
        }

        let mut resolution = Resolution::default();
        let mut seen_locations = FxHashSet::default();
        // class name → declaring manifest
        let mut seen_classes: FxHashMap<String, SourceLocation> = FxHashMap::default();

        for ident in identifiers {
            let files = match self.locate(ident)? {
                Target::Module(path) => vec![path],
                Target::Package { dir, members } => {
                    if members.is_empty() {
                        return Err(ResolveError::EmptyPackage {
                            identifier: ident.to_string(),
                            dir,
                        });
                    }
                    if !resolution.packages.contains(&dir) {
                        resolution.packages.push(dir);
                    }
                    members
                }
            };

            let mut contributed = 0;
            for file in files {
                let location = SourceLocation::new(&file);
                let manifest = self.cache.load(location.path())?;

                if seen_locations.insert(location.clone()) {
                    resolution.locations.push(location.clone());
                }

                contributed += collect_classes(
                    ident,
                    &location,
                    &manifest,
                    &mut seen_classes,
                    &mut resolution.classes,
                )?;
            }

            if contributed == 0 {
                return Err(match ident.class() {
                    Some(class) => ResolveError::UnknownClass {
                        identifier: ident.to_string(),
                        class: class.to_string(),
                    },
                    None => ResolveError::NoWorkers {
                        identifier: ident.to_string(),
                    },
                });
            }
        }

        crate::debug!(
            "resolve";
            "{} -> {} location(s), {} class(es)",
            identifiers.iter().map(Identifier::as_str).collect::<Vec<_>>().join(" "),
            resolution.locations.len(),
            resolution.classes.len()
        );

        Ok(resolution)
    }

    /// Decide whether an identifier names a module file or a package directory.
    ///
    /// The module file wins when both exist.
    fn locate(&self, ident: &Identifier) -> Result<Target, ResolveError> {
        let module = ident.module_path(&self.root);
        if module.is_file() {
            return Ok(Target::Module(module));
        }

        let dir = ident.package_path(&self.root);
        if dir.is_dir() {
            let members = package_members(&dir)?;
            return Ok(Target::Package {
                dir: normalize_path(&dir),
                members,
            });
        }

        Err(ResolveError::NotFound {
            identifier: ident.to_string(),
            root: self.root.clone(),
        })
    }
}

/// Every manifest directly inside `dir`, sorted by file name.
///
/// A package with a single member goes through the same path as any other.
/// Hidden files and editor temp files are skipped.
pub fn package_members(dir: &Path) -> Result<Vec<PathBuf>, ResolveError> {
    let entries = std::fs::read_dir(dir).map_err(|err| ResolveError::Io(dir.to_path_buf(), err))?;

    let mut members = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|err| ResolveError::Io(dir.to_path_buf(), err))?
            .path();
        let is_manifest = path.extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION);
        if is_manifest && path.is_file() && !is_temp_file(&path) {
            members.push(path);
        }
    }

    members.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(members)
}

/// Append the classes `manifest` contributes for `ident`.
///
/// Returns how many classes matched the identifier, counting ones that were
/// already registered through an overlapping identifier.
fn collect_classes(
    ident: &Identifier,
    location: &SourceLocation,
    manifest: &Arc<Manifest>,
    seen: &mut FxHashMap<String, SourceLocation>,
    out: &mut Vec<WorkerClassRef>,
) -> Result<usize, ResolveError> {
    let mut matched = 0;

    for definition in &manifest.workers {
        if ident.class().is_some_and(|class| class != definition.name) {
            continue;
        }
        matched += 1;

        match seen.get(&definition.name) {
            Some(first) if first == location => continue,
            Some(first) => {
                return Err(ResolveError::DuplicateClass {
                    name: definition.name.clone(),
                    first: first.path().to_path_buf(),
                    second: location.path().to_path_buf(),
                });
            }
            None => {}
        }

        seen.insert(definition.name.clone(), location.clone());
        out.push(WorkerClassRef {
            location: location.clone(),
            definition: definition.clone(),
        });
    }

    Ok(matched)
}

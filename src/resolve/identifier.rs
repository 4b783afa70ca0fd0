//! Worker identifier parsing.
//!
//! Grammar: `segment(.segment)*[:ClassName]`, where a segment is made of
//! ASCII alphanumerics, `_` or `-`, and a class name of alphanumerics or `_`.

use std::fmt;
use std::path::{Path, PathBuf};

use super::ResolveError;

/// An operator-supplied module or package name, validated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    raw: String,
    /// Leading path segments (`a.b` in `a.b.c`)
    parents: Vec<String>,
    /// Final segment (`c` in `a.b.c`)
    name: String,
    class: Option<String>,
}

impl Identifier {
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let malformed = |reason| ResolveError::Malformed {
            identifier: raw.to_string(),
            reason,
        };

        let (module, class) = match raw.split_once(':') {
            Some((module, class)) => (module, Some(class)),
            None => (raw, None),
        };

        if module.is_empty() {
            return Err(malformed("module path is empty"));
        }

        let mut segments = Vec::new();
        for segment in module.split('.') {
            if segment.is_empty() {
                return Err(malformed("empty path segment"));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(malformed("path segments may only contain [A-Za-z0-9_-]"));
            }
            segments.push(segment.to_string());
        }

        let class = match class {
            None => None,
            Some("") => return Err(malformed("class name after `:` is empty")),
            Some(name) if !is_class_name(name) => {
                return Err(malformed("class names may only contain [A-Za-z0-9_]"));
            }
            Some(name) => Some(name.to_string()),
        };

        let Some(name) = segments.pop() else {
            return Err(malformed("module path is empty"));
        };

        Ok(Self {
            raw: raw.to_string(),
            parents: segments,
            name,
            class,
        })
    }

    /// Parse every identifier, failing on the first malformed one.
    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Self>, ResolveError> {
        raw.iter().map(|s| Self::parse(s.as_ref())).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Class filter from the `:ClassName` suffix.
    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// `<root>/a/b.toml`: the single-manifest candidate.
    pub fn module_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.parents);
        path.push(format!("{}.{}", self.name, super::MANIFEST_EXTENSION));
        path
    }

    /// `<root>/a/b/`: the package candidate.
    pub fn package_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(&self.parents);
        path.push(&self.name);
        path
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Worker class names: non-empty, `[A-Za-z0-9_]`.
pub(super) fn is_class_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

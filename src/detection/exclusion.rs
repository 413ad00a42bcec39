//! Path exclusion filter.

use std::path::{Component, Path, PathBuf};

/// Predicate over paths built from configured excluded directory prefixes.
///
/// Matching is by whole path components, so excluding `/data/app` does not
/// exclude `/data/apple`.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    prefixes: Vec<PathBuf>,
}

impl ExclusionFilter {
    /// Build a filter from configured path strings. Blank entries are ignored.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = paths
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| normalize(Path::new(p.as_ref().trim())))
            .collect();

        Self { prefixes }
    }

    /// Check whether a path or any of its ancestors is excluded.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.prefixes.is_empty() {
            return false;
        }
        let path = normalize(path);
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

/// Make a path absolute and fold `.` and `..` without touching the filesystem.
///
/// `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

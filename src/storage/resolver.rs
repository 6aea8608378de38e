//! Path resolution
//!
//! Maps caller-relative paths onto the served root.

use std::path::{Component, Path, PathBuf};

use crate::error::{FsError, Operation};

/// Joins relative paths onto a fixed root.
///
/// The join is lexical: no existence check and no `..` normalization.
/// Leading `/` separators are stripped so an absolute caller path still
/// lands under the root, and trailing ones so `f.txt/` names the file.
/// Unless confinement is enabled, a path with enough `..` segments
/// resolves outside the root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    confine: bool,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            confine: false,
        }
    }

    /// Enable or disable rejection of paths that climb out of the root.
    pub fn confined(mut self, confine: bool) -> Self {
        self.confine = confine;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_confined(&self) -> bool {
        self.confine
    }

    /// Plain join of the root and `relative`.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_matches('/'))
    }

    /// Join, enforcing confinement when it is enabled.
    pub fn resolve_for(&self, operation: Operation, relative: &str) -> Result<PathBuf, FsError> {
        if self.confine && escapes_root(relative) {
            return Err(FsError::outside_root(operation, relative));
        }
        Ok(self.resolve(relative))
    }

    /// Join both sides of a rename; a rejection names both paths.
    pub fn resolve_pair(
        &self,
        operation: Operation,
        old: &str,
        new: &str,
    ) -> Result<(PathBuf, PathBuf), FsError> {
        if self.confine && (escapes_root(old) || escapes_root(new)) {
            return Err(FsError::outside_root_between(operation, old, new));
        }
        Ok((self.resolve(old), self.resolve(new)))
    }
}

/// Whether `relative` lexically climbs above its starting directory.
fn escapes_root(relative: &str) -> bool {
    let mut depth: usize = 0;
    for component in Path::new(relative.trim_start_matches('/')).components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }
    false
}

//! Locator for compiled class files.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use super::{Error, Result};
use crate::config::Config;

/// File extension of compiled classes.
pub const CLASS_EXTENSION: &str = "class";

/// All `.class` files below a root directory, sorted for reproducible output.
#[derive(Debug, Clone)]
pub struct ClassFileSet {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl ClassFileSet {
    /// Collect class files under `path`, honouring the configured excludes.
    pub fn from_path(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        Self::from_path_with_patterns(path, &config.exclude_patterns)
    }

    /// Collect class files under `path` without excludes.
    pub fn from_path_default(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with_patterns(path, &[])
    }

    /// Collect class files under `path`, skipping paths matching any glob.
    pub fn from_path_with_patterns(
        path: impl AsRef<Path>,
        exclude_patterns: &[String],
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let root = path.canonicalize()?;
        let excludes = build_glob_set(exclude_patterns)?;

        let mut files = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) != Some(CLASS_EXTENSION) {
                continue;
            }
            let relative = file.strip_prefix(&root).unwrap_or(file);
            if excludes.is_match(relative) || excludes.is_match(file) {
                continue;
            }
            files.push(file.to_path_buf());
        }

        // Sort for deterministic ordering
        files.sort();
        tracing::debug!("Found {} class files under {}", files.len(), root.display());

        Ok(Self { root, files })
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get all files in the set.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Get the number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over files.
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }

    /// Get relative path from root.
    pub fn relative_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

impl<'a> IntoIterator for &'a ClassFileSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::config(format!("invalid exclude pattern {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::config(format!("invalid exclude patterns: {e}")))
}

//! Directory scanning for marker and descriptor files.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

/// Returns every file named `marker` under `root`, in sorted order.
///
/// Hidden directories are searched too; only the marker's own name matters.
pub fn find_markers(root: &Path, marker: &str) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut markers = Vec::new();
    for entry in sorted_walk(root) {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == marker {
            markers.push(entry.into_path());
        }
    }
    Ok(markers)
}

/// Decides which regular files under the root are descriptor candidates.
#[derive(Debug, Clone)]
pub struct DescriptorFilter {
    marker: String,
    include: Option<GlobSet>,
    exclude: Vec<PathBuf>,
}

impl DescriptorFilter {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            include: None,
            exclude: Vec::new(),
        }
    }

    /// Restricts candidates to root-relative paths matching any of `patterns`.
    /// An empty list keeps every file.
    pub fn with_include(mut self, patterns: &[String]) -> Result<Self, globset::Error> {
        if patterns.is_empty() {
            self.include = None;
            return Ok(self);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern)?);
        }
        self.include = Some(builder.build()?);
        Ok(self)
    }

    /// Never treats `path` as a descriptor, e.g. the settings file.
    pub fn with_exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude.push(path.into());
        self
    }

    fn accepts(&self, root: &Path, path: &Path) -> bool {
        if path.file_name().is_some_and(|name| name == self.marker.as_str()) {
            return false;
        }
        if self.exclude.iter().any(|excluded| excluded == path) {
            return false;
        }
        match (&self.include, path.strip_prefix(root)) {
            (Some(set), Ok(relative)) => set.is_match(relative),
            (Some(_), Err(_)) => false,
            (None, _) => true,
        }
    }
}

/// Returns descriptor candidates under `root` in discovery order.
///
/// Hidden files and anything inside hidden directories are skipped, as are
/// marker files and explicitly excluded paths.
pub fn find_descriptors(
    root: &Path,
    filter: &DescriptorFilter,
) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut descriptors = Vec::new();
    let walker = sorted_walk(root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if filter.accepts(root, entry.path()) {
            descriptors.push(entry.into_path());
        }
    }
    Ok(descriptors)
}

fn sorted_walk(root: &Path) -> WalkDir {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

//! Directory-keyed index of every marker file under a scan root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ConfigError, ConfigFragment};
use crate::walk;

/// Immutable mapping from a directory to the fragment its marker file declares.
#[derive(Debug, Default)]
pub struct ConfigIndex {
    fragments: HashMap<PathBuf, ConfigFragment>,
}

impl ConfigIndex {
    /// Loads every `marker` file under `root`.
    ///
    /// Fails on the first unreadable or malformed marker; no partial index is
    /// ever returned.
    pub fn build(root: &Path, marker: &str) -> Result<Self, ConfigError> {
        let markers = walk::find_markers(root, marker).map_err(|e| ConfigError::Walk {
            root: root.to_path_buf(),
            source: e,
        })?;

        let mut fragments = HashMap::with_capacity(markers.len());
        for path in markers {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
                path: path.clone(),
                source: e,
            })?;
            let fragment = ConfigFragment::parse(&content, &path)?;
            let dir = path.parent().unwrap_or(root).to_path_buf();
            debug!(dir = %dir.display(), "loaded marker file");
            fragments.insert(dir, fragment);
        }

        Ok(Self { fragments })
    }

    /// Builds an index from fragments already in memory.
    pub fn from_fragments(fragments: impl IntoIterator<Item = (PathBuf, ConfigFragment)>) -> Self {
        Self {
            fragments: fragments.into_iter().collect(),
        }
    }

    pub fn get(&self, dir: &Path) -> Option<&ConfigFragment> {
        self.fragments.get(dir)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragments governing `file`, ordered from `root` down to the file's parent.
    ///
    /// Returns an empty chain when `file` is not under `root`.
    pub fn chain<'a>(&'a self, root: &Path, file: &Path) -> Vec<(PathBuf, &'a ConfigFragment)> {
        let Some(relative_dir) = file.parent().and_then(|p| p.strip_prefix(root).ok()) else {
            return Vec::new();
        };

        let mut chain = Vec::new();
        let mut current = root.to_path_buf();
        if let Some(fragment) = self.get(&current) {
            chain.push((current.clone(), fragment));
        }
        for component in relative_dir.components() {
            current.push(component);
            if let Some(fragment) = self.get(&current) {
                chain.push((current.clone(), fragment));
            }
        }
        chain
    }
}

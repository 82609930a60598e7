use std::path::PathBuf;

use crate::config::ConfigError;
use thiserror::Error;

/// Errors that abort a whole run before any request is issued.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot open scan root '{path}': {source}")]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to scan '{root}' for descriptor files: {source}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },

    #[error("failed to stat descriptor file '{path}': {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid include pattern: {0}")]
    Include(#[source] globset::Error),

    #[error("runner requires an HTTP client")]
    MissingClient,
}

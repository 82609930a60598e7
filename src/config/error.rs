use std::path::PathBuf;
use thiserror::Error;

/// Failure to load the marker files that make up a [`ConfigIndex`](super::ConfigIndex).
///
/// Any one of these aborts the run before a single request is issued.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read marker file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse marker file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to scan for marker files under '{root}': {source}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
}

/// A governed descriptor file whose request could not be constructed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("'{url}' built for '{file}' is not a valid URL: {source}")]
    InvalidUrl {
        file: PathBuf,
        url: String,
        source: url::ParseError,
    },
}

impl ResolveError {
    /// The descriptor file the failed resolution belongs to.
    pub fn file(&self) -> &std::path::Path {
        match self {
            ResolveError::InvalidUrl { file, .. } => file,
        }
    }
}

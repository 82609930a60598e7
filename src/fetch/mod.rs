//! Refreshing descriptor files from the remote API.

mod client;
mod notify;
mod summary;
mod write;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

pub use client::{HttpClient, HttpResponse, ReqwestClient, TransportError};
pub use notify::{Event, LogNotifier, Notifier, NoopNotifier};
pub use summary::{Failure, RunSummary, Warning};
pub use write::{render_body, write_atomic};

use crate::config::{resolve, ConfigIndex, ResolveError, ResolvedRequest, DEFAULT_MARKER};
use crate::settings::Settings;
use crate::walk::{self, DescriptorFilter};
use crate::Error;

/// Failure of a single item; never aborts the run.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("response body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What to refresh in a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Only refresh descriptor files that are still empty.
    pub only_new: bool,
    /// Root-relative glob patterns; empty means every file.
    pub include: Vec<String>,
    pub marker: String,
    /// Headers sent with every request, overridden by marker headers.
    pub default_headers: IndexMap<String, String>,
    /// Files never treated as descriptors.
    pub exclude: Vec<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            only_new: false,
            include: Vec::new(),
            marker: DEFAULT_MARKER.to_string(),
            default_headers: IndexMap::new(),
            exclude: Vec::new(),
        }
    }
}

impl From<&Settings> for RunOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            only_new: settings.only_new,
            include: settings.include.clone(),
            marker: settings.marker.clone(),
            default_headers: settings.http.headers.clone(),
            exclude: Vec::new(),
        }
    }
}

enum Outcome {
    Written { bytes: usize },
    Status(u16),
}

/// Refreshes every governed descriptor file under a root.
///
/// The HTTP client and notifier are injected, so runs can be observed and
/// tested without touching the network.
///
/// ## Example
///
/// ```no_run
/// use getafix::{Getafix, HttpSettings, LogNotifier, ReqwestClient, RunOptions};
///
/// let getafix = Getafix::builder()
///     .with_client(ReqwestClient::new(&HttpSettings::default())?)
///     .with_notifier(LogNotifier)
///     .build()?;
///
/// let summary = getafix.run("fixtures", &RunOptions::default())?;
/// println!("{} updated", summary.succeeded.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Getafix<C> {
    client: C,
    notifier: Box<dyn Notifier>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Getafix<()> {
    /// Creates a new builder for constructing a `Getafix` runner.
    pub fn builder() -> GetafixBuilder<()> {
        GetafixBuilder {
            client: None,
            notifier: Box::new(NoopNotifier),
            cancel: None,
        }
    }
}

/// Builder for [`Getafix`].
///
/// Starts without a client (`GetafixBuilder<()>`) and transitions to
/// `GetafixBuilder<C>` once [`with_client`](Self::with_client) is called.
#[must_use = "builders do nothing until .build() is called"]
pub struct GetafixBuilder<C> {
    client: Option<C>,
    notifier: Box<dyn Notifier>,
    cancel: Option<Arc<AtomicBool>>,
}

impl GetafixBuilder<()> {
    pub fn with_client<C: HttpClient>(self, client: C) -> GetafixBuilder<C> {
        GetafixBuilder {
            client: Some(client),
            notifier: self.notifier,
            cancel: self.cancel,
        }
    }
}

impl<C> GetafixBuilder<C> {
    /// Replaces the default notifier, which discards events.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Stops the run at the next item boundary once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Returns an error if no client was provided.
    pub fn build(self) -> Result<Getafix<C>, Error> {
        Ok(Getafix {
            client: self.client.ok_or(Error::MissingClient)?,
            notifier: self.notifier,
            cancel: self.cancel,
        })
    }
}

impl<C: HttpClient> Getafix<C> {
    /// Refreshes descriptor files under `root`, one at a time in discovery order.
    ///
    /// Fails before any request is issued if a marker file is malformed or,
    /// with `only_new`, a candidate cannot be stat'ed. Per-item failures are
    /// collected in the returned [`RunSummary`].
    pub fn run(&self, root: impl AsRef<Path>, options: &RunOptions) -> Result<RunSummary, Error> {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).map_err(|e| Error::Root {
            path: root.to_path_buf(),
            source: e,
        })?;

        let index = ConfigIndex::build(&root, &options.marker)?;
        info!(root = %root.display(), markers = index.len(), "loaded configuration");

        let mut candidates = self.discover(&root, options)?;
        if options.only_new {
            candidates = retain_new(candidates)?;
        }

        let mut summary = RunSummary::default();
        let mut items = Vec::new();
        for file in candidates {
            match resolve(&file, &index, &root) {
                Ok(Some(request)) => items.push(Ok(request)),
                Ok(None) => {
                    debug!(file = %file.display(), "not governed by any marker, skipping");
                    summary.not_governed += 1;
                }
                Err(e) => items.push(Err(e)),
            }
        }

        let total = items.len();
        self.notifier.notify(&Event::Before { size: total });

        for item in items {
            if self.is_cancelled() {
                warn!(remaining = total - summary.processed(), "run cancelled");
                summary.cancelled = true;
                break;
            }
            match item {
                Ok(request) => self.refresh(request, &options.default_headers, &mut summary),
                Err(e) => self.record_unresolved(e, &mut summary),
            }
        }

        info!(
            succeeded = summary.succeeded.len(),
            warnings = summary.warnings.len(),
            failures = summary.failures.len(),
            not_governed = summary.not_governed,
            "run finished"
        );
        Ok(summary)
    }

    fn discover(&self, root: &Path, options: &RunOptions) -> Result<Vec<PathBuf>, Error> {
        let mut filter = DescriptorFilter::new(options.marker.as_str())
            .with_include(&options.include)
            .map_err(Error::Include)?;
        for excluded in &options.exclude {
            filter = filter.with_exclude(excluded.clone());
        }

        walk::find_descriptors(root, &filter).map_err(|e| Error::Walk {
            root: root.to_path_buf(),
            source: e,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn refresh(
        &self,
        request: ResolvedRequest,
        default_headers: &IndexMap<String, String>,
        summary: &mut RunSummary,
    ) {
        let file = request.file.as_path();
        let url = request.url.as_str();
        debug!(file = %file.display(), url, "updating");
        self.notifier.notify(&Event::Requesting { file, url });

        match self.fetch(&request, default_headers) {
            Ok(Outcome::Written { bytes }) => {
                debug!(file = %file.display(), bytes, "wrote response");
                self.notifier.notify(&Event::Success { file });
                summary.succeeded.push(file.to_path_buf());
            }
            Ok(Outcome::Status(code)) => {
                self.notifier.notify(&Event::Warning { file, url, code });
                summary.warnings.push(Warning {
                    file: file.to_path_buf(),
                    url: url.to_string(),
                    code,
                });
            }
            Err(e) => {
                let error = e.to_string();
                self.notifier.notify(&Event::Failed {
                    file,
                    url: Some(url),
                    error: error.clone(),
                });
                summary.failures.push(Failure {
                    file: file.to_path_buf(),
                    url: Some(url.to_string()),
                    error,
                });
            }
        }
    }

    fn fetch(
        &self,
        request: &ResolvedRequest,
        default_headers: &IndexMap<String, String>,
    ) -> Result<Outcome, FetchError> {
        let mut headers = default_headers.clone();
        headers.extend(request.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        let response = self.client.get(&request.url, &headers)?;
        debug!(url = request.url.as_str(), status = response.status, "response");
        if response.status >= 300 {
            return Ok(Outcome::Status(response.status));
        }

        let body = render_body(&response.body, request.is_structured_format)
            .map_err(FetchError::InvalidJson)?;
        write_atomic(&request.file, &body).map_err(|e| FetchError::Write {
            path: request.file.clone(),
            source: e,
        })?;
        Ok(Outcome::Written { bytes: body.len() })
    }

    fn record_unresolved(&self, error: ResolveError, summary: &mut RunSummary) {
        let file = error.file();
        let message = error.to_string();
        self.notifier.notify(&Event::Failed {
            file,
            url: None,
            error: message.clone(),
        });
        summary.failures.push(Failure {
            file: file.to_path_buf(),
            url: None,
            error: message,
        });
    }
}

/// Keeps descriptor files that have no content yet.
fn retain_new(files: Vec<PathBuf>) -> Result<Vec<PathBuf>, Error> {
    let mut kept = Vec::with_capacity(files.len());
    for file in files {
        let metadata = std::fs::metadata(&file).map_err(|e| Error::Stat {
            path: file.clone(),
            source: e,
        })?;
        if metadata.len() == 0 {
            kept.push(file);
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builder_requires_client() {
        let result = GetafixBuilder::<ReqwestClient> {
            client: None,
            notifier: Box::new(NoopNotifier),
            cancel: None,
        }
        .build();

        assert!(matches!(result, Err(Error::MissingClient)));
    }

    #[test]
    fn test_retain_new_keeps_empty_files() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.json");
        let full = dir.path().join("full.json");
        fs::write(&empty, "").unwrap();
        fs::write(&full, "{}").unwrap();

        let kept = retain_new(vec![empty.clone(), full]).unwrap();
        assert_eq!(kept, [empty]);
    }

    #[test]
    fn test_retain_new_propagates_stat_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.json");

        let err = retain_new(vec![missing.clone()]).unwrap_err();
        assert!(matches!(err, Error::Stat { ref path, .. } if *path == missing));
    }

    #[test]
    fn test_options_from_settings() {
        let mut settings = Settings::default();
        settings.only_new = true;
        settings.include = vec!["**/*.json".into()];
        settings
            .http
            .headers
            .insert("Accept".into(), "application/json".into());

        let options = RunOptions::from(&settings);
        assert!(options.only_new);
        assert_eq!(options.include, ["**/*.json"]);
        assert_eq!(options.marker, ".getafix");
        assert_eq!(options.default_headers["Accept"], "application/json");
    }
}

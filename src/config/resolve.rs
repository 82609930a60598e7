//! Resolution of a descriptor file into the request that refreshes it.
//!
//! Fragments along the directory chain are folded root-to-leaf, so deeper
//! markers override shallower ones:
//!
//! - `base`: the last non-empty value wins, and resets the path remainder to
//!   be relative to the directory that declared it
//! - `query` / `headers`: overlaid key by key; a `null` query value tombstones
//!   the key
//! - `map`: transforms the current path remainder when it is reached
//!
//! Query parameters written literally into the resulting URL take precedence
//! over inherited defaults. Tombstoned keys are removed last, after every
//! layer has been merged.

use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use url::Url;

use super::{ConfigFragment, ConfigIndex, QueryValue, ResolveError};

/// Everything needed to fetch and store one descriptor file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub file: PathBuf,
    pub url: Url,
    pub headers: IndexMap<String, String>,
    /// The descriptor holds JSON and the body is re-serialized before writing.
    pub is_structured_format: bool,
}

#[derive(Debug, Clone, Default)]
struct MergedConfig {
    base: String,
    query: IndexMap<String, QueryValue>,
    headers: IndexMap<String, String>,
    path_remainder: String,
}

impl MergedConfig {
    fn apply(mut self, dir: &Path, fragment: &ConfigFragment, file: &Path) -> Self {
        if let Some(base) = fragment.base() {
            self.base = base.to_string();
            self.path_remainder = path_remainder(file, dir);
        }
        self.query.extend(
            fragment
                .query
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        self.headers.extend(
            fragment
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        if let Some(transform) = &fragment.map {
            self.path_remainder = transform.apply(&self.path_remainder);
        }
        self
    }
}

/// Resolves `file` against the markers in `index`.
///
/// Returns `Ok(None)` when no marker between `root` and the file's parent
/// governs it.
pub fn resolve(
    file: &Path,
    index: &ConfigIndex,
    root: &Path,
) -> Result<Option<ResolvedRequest>, ResolveError> {
    let chain = index.chain(root, file);
    if chain.is_empty() {
        return Ok(None);
    }

    let initial = MergedConfig {
        path_remainder: path_remainder(file, root),
        ..MergedConfig::default()
    };
    let merged = chain
        .iter()
        .fold(initial, |merged, (dir, fragment)| merged.apply(dir, fragment, file));

    let url = build_url(file, &merged)?;
    Ok(Some(ResolvedRequest {
        file: file.to_path_buf(),
        url,
        headers: merged.headers,
        is_structured_format: file.extension().is_some_and(|ext| ext == "json"),
    }))
}

fn build_url(file: &Path, merged: &MergedConfig) -> Result<Url, ResolveError> {
    let candidate = format!("{}{}", merged.base, merged.path_remainder);
    let mut url = Url::parse(&candidate).map_err(|e| ResolveError::InvalidUrl {
        file: file.to_path_buf(),
        url: candidate.clone(),
        source: e,
    })?;

    // Every literal pair is kept, repeated keys included; inherited parameters
    // only fill keys the URL does not mention.
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    for (key, value) in &merged.query {
        if pairs.iter().any(|(literal, _)| literal == key) {
            continue;
        }
        if let Some(value) = value.as_present() {
            pairs.push((key.clone(), value.to_string()));
        }
    }

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    Ok(url)
}

/// The part of `file` below `dir`, `/`-joined, without the file extension.
fn path_remainder(file: &Path, dir: &Path) -> String {
    let relative = file.strip_prefix(dir).unwrap_or(file);
    let stripped = match (relative.file_stem(), relative.extension()) {
        (Some(stem), Some(_)) => relative.with_file_name(stem),
        _ => relative.to_path_buf(),
    };

    let mut remainder = String::new();
    for component in stripped.components() {
        if let Component::Normal(part) = component {
            remainder.push('/');
            remainder.push_str(&part.to_string_lossy());
        }
    }
    remainder
}

//! Rendering and persisting fetched bodies.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Renders a response body for storage.
///
/// Structured bodies are re-serialized as 2-space indented JSON with a trailing
/// newline, keeping key order. Anything else is stored verbatim.
pub fn render_body(body: &[u8], structured: bool) -> Result<Vec<u8>, serde_json::Error> {
    if !structured {
        return Ok(body.to_vec());
    }
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let mut rendered = serde_json::to_vec_pretty(&value)?;
    rendered.push(b'\n');
    Ok(rendered)
}

/// Replaces `path` with `contents` through a temporary sibling file and a rename,
/// so a failed write never leaves a truncated descriptor behind.
///
/// The destination directory must already exist. An existing destination
/// keeps its permissions.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

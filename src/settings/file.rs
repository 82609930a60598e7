//! TOML file layer for run settings.

use std::path::{Path, PathBuf};

use super::source::{SettingsEntry, SettingsSource};
use super::SettingsError;

/// Loads settings from a TOML file such as `getafix.toml`.
///
/// A missing optional file contributes nothing; a missing required file is an
/// error.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }
}

impl SettingsSource for FileSource {
    fn entries(&self) -> Result<Vec<SettingsEntry>, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let table = toml::from_str(&contents).map_err(|e| SettingsError::Parse {
                    path: self.path.clone(),
                    source: e,
                })?;
                Ok(vec![SettingsEntry::root(table)])
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if self.required {
                    Err(SettingsError::FileNotFound(self.path.clone()))
                } else {
                    Ok(vec![])
                }
            }
            Err(e) => Err(SettingsError::Read {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_source_loads_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "only_new = true").unwrap();

        let entries = FileSource::new(file.path(), true).entries().unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.is_empty());
        let table = entries[0].value.as_table().unwrap();
        assert_eq!(table.get("only_new"), Some(&toml::Value::Boolean(true)));
    }

    #[test]
    fn test_file_source_required_missing() {
        let result = FileSource::new("/nonexistent/getafix.toml", true).entries();
        assert!(matches!(result, Err(SettingsError::FileNotFound(_))));
    }

    #[test]
    fn test_file_source_optional_missing() {
        let entries = FileSource::new("/nonexistent/getafix.toml", false).entries().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_file_source_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "only_new = ").unwrap();

        let result = FileSource::new(file.path(), true).entries();
        assert!(matches!(result, Err(SettingsError::Parse { .. })));
    }
}

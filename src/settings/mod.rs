//! Run settings: which files to refresh and how to talk to the remote API.
//!
//! Settings are layered from sources in registration order, later layers
//! overriding earlier ones. Nested tables merge recursively; other values
//! (including arrays) are replaced entirely. The merged table is deserialized
//! once into [`Settings`].
//!
//! ```no_run
//! use getafix::Settings;
//!
//! // defaults -> getafix.toml -> GETAFIX__* environment variables
//! let settings = Settings::loader()
//!     .with_file("getafix.toml", false)
//!     .with_env("GETAFIX", "__")
//!     .load()?;
//! # Ok::<(), getafix::SettingsError>(())
//! ```

mod env;
mod error;
mod file;
mod source;

use indexmap::IndexMap;
use serde::Deserialize;

pub use env::EnvSource;
pub use error::SettingsError;
pub use file::FileSource;
pub use source::{SettingsEntry, SettingsSource};

use crate::config::DEFAULT_MARKER;

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "getafix.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Marker file name scoping endpoint configuration.
    pub marker: String,
    /// Only refresh descriptor files that are still empty.
    pub only_new: bool,
    /// Root-relative glob patterns; empty means every file.
    pub include: Vec<String>,
    pub http: HttpSettings,
    pub log: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            only_new: false,
            include: Vec::new(),
            http: HttpSettings::default(),
            log: LogSettings::default(),
        }
    }
}

impl Settings {
    pub fn loader() -> SettingsLoader {
        SettingsLoader::default()
    }

    /// Applies command-line flags on top of every loaded layer.
    pub fn apply_overrides(&mut self, overrides: SettingsOverrides) {
        if overrides.only_new {
            self.only_new = true;
        }
        if !overrides.include.is_empty() {
            self.include = overrides.include;
        }
        if let Some(marker) = overrides.marker {
            self.marker = marker;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.http.timeout_secs = timeout_secs;
        }
        if let Some(format) = overrides.log_format {
            self.log.format = format;
        }
    }
}

/// Flag values that take precedence over files and the environment.
///
/// Unset fields (`false`, empty, `None`) leave the loaded value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub only_new: bool,
    pub include: Vec<String>,
    pub marker: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Sent with every request; marker file headers take precedence.
    pub headers: IndexMap<String, String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("getafix/", env!("CARGO_PKG_VERSION")).to_string(),
            headers: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Builder collecting settings layers.
#[derive(Debug, Default)]
#[must_use = "loaders do nothing until .load() is called"]
pub struct SettingsLoader {
    sources: Vec<Box<dyn SettingsSource>>,
}

impl SettingsLoader {
    /// Adds a TOML file layer. Missing optional files are skipped.
    pub fn with_file(self, path: impl AsRef<std::path::Path>, required: bool) -> Self {
        self.with_source(FileSource::new(path, required))
    }

    /// Adds an environment variable layer, e.g. `with_env("GETAFIX", "__")`.
    pub fn with_env(self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    pub fn with_source(mut self, source: impl SettingsSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn load(self) -> Result<Settings, SettingsError> {
        let mut merged = toml::Table::new();
        for layer in &self.sources {
            for entry in layer.entries()? {
                source::merge_at_path(&mut merged, &entry.path, entry.value);
            }
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(SettingsError::Deserialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug)]
    struct Fixed(Vec<(Vec<&'static str>, toml::Value)>);

    impl SettingsSource for Fixed {
        fn entries(&self) -> Result<Vec<SettingsEntry>, SettingsError> {
            Ok(self
                .0
                .iter()
                .map(|(path, value)| {
                    SettingsEntry::at_path(
                        path.iter().map(|s| s.to_string()).collect(),
                        value.clone(),
                    )
                })
                .collect())
        }
    }

    #[test]
    fn test_no_sources_yields_defaults() {
        let settings = Settings::loader().load().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.marker, ".getafix");
        assert_eq!(settings.http.timeout_secs, 30);
    }

    #[test]
    fn test_file_then_override_layer() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "only_new = true\ninclude = [\"**/*.json\"]\n\n[http]\ntimeout_secs = 10\n\n[http.headers]\nAccept = \"application/json\"\n\n[log]\nformat = \"json\""
        )
        .unwrap();

        let settings = Settings::loader()
            .with_file(file.path(), true)
            .with_source(Fixed(vec![(
                vec!["http", "timeout_secs"],
                toml::Value::Integer(3),
            )]))
            .load()
            .unwrap();

        assert!(settings.only_new);
        assert_eq!(settings.include, ["**/*.json"]);
        assert_eq!(settings.http.timeout_secs, 3);
        assert_eq!(settings.http.headers["Accept"], "application/json");
        assert!(settings.http.user_agent.starts_with("getafix/"));
        assert_eq!(settings.log.format, LogFormat::Json);
    }

    #[test]
    fn test_env_layer() {
        std::env::set_var("GETAFIX_SETTINGS_TEST__LOG__LEVEL", "debug");
        std::env::set_var("GETAFIX_SETTINGS_TEST__ONLY_NEW", "true");

        let settings = Settings::loader()
            .with_env("GETAFIX_SETTINGS_TEST", "__")
            .load()
            .unwrap();

        assert_eq!(settings.log.level, "debug");
        assert!(settings.only_new);
    }

    #[test]
    fn test_file_then_env_then_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "marker = \".fixtures\"\ninclude = [\"api/**\"]\n\n[http]\ntimeout_secs = 10\n\n[log]\nlevel = \"warn\""
        )
        .unwrap();
        std::env::set_var("GETAFIX_LAYERING_TEST__HTTP__TIMEOUT_SECS", "20");
        std::env::set_var("GETAFIX_LAYERING_TEST__LOG__LEVEL", "debug");

        let mut settings = Settings::loader()
            .with_file(file.path(), true)
            .with_env("GETAFIX_LAYERING_TEST", "__")
            .load()
            .unwrap();

        assert_eq!(settings.http.timeout_secs, 20);
        assert_eq!(settings.log.level, "debug");
        assert_eq!(settings.marker, ".fixtures");

        settings.apply_overrides(SettingsOverrides {
            timeout_secs: Some(5),
            include: vec!["users/*.json".into()],
            ..SettingsOverrides::default()
        });

        assert_eq!(settings.http.timeout_secs, 5);
        assert_eq!(settings.include, ["users/*.json"]);
        assert_eq!(settings.log.level, "debug");
        assert_eq!(settings.marker, ".fixtures");
        assert!(!settings.only_new);
    }

    #[test]
    fn test_empty_overrides_change_nothing() {
        let mut settings = Settings::default();
        settings.only_new = true;
        settings.include = vec!["a/**".into()];
        let loaded = settings.clone();

        settings.apply_overrides(SettingsOverrides::default());
        assert_eq!(settings, loaded);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = Settings::loader()
            .with_source(Fixed(vec![(vec!["timeout"], toml::Value::Integer(3))]))
            .load();

        assert!(matches!(result, Err(SettingsError::Deserialize(_))));
    }
}

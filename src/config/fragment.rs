//! Parsed representation of a single `.getafix` marker file.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use super::transform::PathTransform;
use super::ConfigError;

/// A query parameter value as declared in a marker file.
///
/// `Tombstoned` cancels a key inherited from an ancestor directory. It is
/// distinct from the key never having been set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Present(String),
    Tombstoned,
}

impl QueryValue {
    pub fn as_present(&self) -> Option<&str> {
        match self {
            QueryValue::Present(value) => Some(value),
            QueryValue::Tombstoned => None,
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Present(value.to_string())
    }
}

impl<'de> Deserialize<'de> for QueryValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<Scalar>::deserialize(deserializer)? {
            Some(scalar) => QueryValue::Present(scalar.to_string()),
            None => QueryValue::Tombstoned,
        })
    }
}

/// Any YAML scalar that is written into a URL or header as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

fn scalar_map<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = IndexMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.to_string())).collect())
}

/// Settings declared by one marker file, scoped to its directory and all
/// descendants.
///
/// Every field is optional; an empty fragment is legal and merges as a no-op.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFragment {
    pub base: Option<String>,
    pub query: IndexMap<String, QueryValue>,
    #[serde(deserialize_with = "scalar_map")]
    pub headers: IndexMap<String, String>,
    pub map: Option<PathTransform>,
}

impl ConfigFragment {
    /// Parses marker file content. `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        // An empty or comment-only document deserializes as unit, not a mapping.
        if content.lines().all(|l| {
            let l = l.trim();
            l.is_empty() || l.starts_with('#')
        }) {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// The declared base, treating an empty string as unset.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref().filter(|b| !b.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ConfigFragment {
        ConfigFragment::parse(content, Path::new(".getafix")).unwrap()
    }

    #[test]
    fn test_parses_base_and_numeric_query() {
        let fragment = parse("base: \"http://example.com\"\nquery:\n  foo: 1\n  bar: 2\n");

        assert_eq!(fragment.base(), Some("http://example.com"));
        let keys: Vec<_> = fragment.query.keys().map(String::as_str).collect();
        assert_eq!(keys, ["foo", "bar"]);
        assert_eq!(fragment.query["foo"], QueryValue::from("1"));
    }

    #[test]
    fn test_null_query_value_is_tombstone() {
        let fragment = parse("query:\n  foo: null\n  quux: 3\n");

        assert_eq!(fragment.query["foo"], QueryValue::Tombstoned);
        assert_eq!(fragment.query["quux"], QueryValue::from("3"));
    }

    #[test]
    fn test_tilde_is_also_tombstone() {
        let fragment = parse("query:\n  foo: ~\n");
        assert_eq!(fragment.query["foo"], QueryValue::Tombstoned);
    }

    #[test]
    fn test_header_scalars_are_stringified() {
        let fragment = parse("headers:\n  Accept: application/json\n  X-Version: 2\n  X-Debug: true\n");

        assert_eq!(fragment.headers["Accept"], "application/json");
        assert_eq!(fragment.headers["X-Version"], "2");
        assert_eq!(fragment.headers["X-Debug"], "true");
    }

    #[test]
    fn test_empty_content_is_empty_fragment() {
        let fragment = parse("# nothing here\n\n");

        assert!(fragment.base().is_none());
        assert!(fragment.query.is_empty());
        assert!(fragment.headers.is_empty());
        assert!(fragment.map.is_none());
    }

    #[test]
    fn test_empty_base_counts_as_unset() {
        let fragment = parse("base: \"\"\n");
        assert!(fragment.base().is_none());
    }

    #[test]
    fn test_parses_named_transform() {
        let fragment = parse("map:\n  strip_prefix: /v1\n");
        assert_eq!(
            fragment.map,
            Some(PathTransform::StripPrefix("/v1".to_string()))
        );
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = ConfigFragment::parse("bsae: http://example.com\n", Path::new("/x/.getafix"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_malformed_yaml_reports_path() {
        let err = ConfigFragment::parse("query: [unclosed\n", Path::new("/x/.getafix")).unwrap_err();
        assert!(err.to_string().contains("/x/.getafix"));
    }
}

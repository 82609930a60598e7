use toml::{Table, Value};

use super::SettingsError;

/// A value contributed by a settings source, addressed by its key path.
///
/// An empty path means the value is a whole table merged at the root.
#[derive(Debug, Clone)]
pub struct SettingsEntry {
    pub path: Vec<String>,
    pub value: Value,
}

impl SettingsEntry {
    pub fn root(table: Table) -> Self {
        Self {
            path: Vec::new(),
            value: Value::Table(table),
        }
    }

    pub fn at_path(path: Vec<String>, value: Value) -> Self {
        Self { path, value }
    }
}

/// One layer of run settings. Layers registered later win.
pub trait SettingsSource: Send + Sync + std::fmt::Debug {
    fn entries(&self) -> Result<Vec<SettingsEntry>, SettingsError>;
}

/// Merges `value` into `table` at `path`, creating intermediate tables.
pub fn merge_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        if let Value::Table(overlay) = value {
            deep_merge(table, overlay);
        }
        return;
    };

    if rest.is_empty() {
        match (table.get_mut(first), value) {
            (Some(Value::Table(base)), Value::Table(overlay)) => deep_merge(base, overlay),
            (_, value) => {
                table.insert(first.clone(), value);
            }
        }
        return;
    }

    if !matches!(table.get(first), Some(Value::Table(_))) {
        table.insert(first.clone(), Value::Table(Table::new()));
    }
    if let Some(Value::Table(nested)) = table.get_mut(first) {
        merge_at_path(nested, rest, value);
    }
}

/// Nested tables merge recursively; any other value (arrays included) replaces.
fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(s: &str) -> Table {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_nested_tables_merge() {
        let mut base = table("[http]\ntimeout_secs = 30\nuser_agent = \"a\"\n");
        merge_at_path(&mut base, &[], Value::Table(table("[http]\ntimeout_secs = 5\n")));

        assert_eq!(base["http"]["timeout_secs"].as_integer(), Some(5));
        assert_eq!(base["http"]["user_agent"].as_str(), Some("a"));
    }

    #[test]
    fn test_arrays_are_replaced() {
        let mut base = table("include = [\"**/*.json\", \"**/*.xml\"]\n");
        merge_at_path(&mut base, &[], Value::Table(table("include = [\"a/*\"]\n")));

        assert_eq!(base["include"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_merge_at_missing_path_creates_tables() {
        let mut base = Table::new();
        merge_at_path(
            &mut base,
            &["http".to_string(), "timeout_secs".to_string()],
            Value::Integer(9),
        );

        assert_eq!(base["http"]["timeout_secs"].as_integer(), Some(9));
    }
}

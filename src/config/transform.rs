//! Built-in path remainder transforms selectable from a marker file's `map` field.
//!
//! Marker files never carry executable code. Instead `map` names exactly one of
//! these strategies:
//!
//! ```yaml
//! map:
//!   replace:
//!     pattern: "^/users/(\\d+)$"
//!     with: "/people/$1"
//! ```
//!
//! Templates substitute `${path}`, `${dir}` and `${name}`; `$$` produces a
//! literal `$`.

use regex::Regex;
use serde::Deserialize;

/// A named transform applied to the path remainder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum PathTransform {
    /// Removes the prefix when present; otherwise leaves the path unchanged.
    StripPrefix(String),
    AddPrefix(String),
    AddSuffix(String),
    /// Replaces every regex match, `$1`-style group references allowed.
    Replace(Replace),
    Template(Template),
}

impl PathTransform {
    pub fn apply(&self, path: &str) -> String {
        match self {
            PathTransform::StripPrefix(prefix) => {
                path.strip_prefix(prefix.as_str()).unwrap_or(path).to_string()
            }
            PathTransform::AddPrefix(prefix) => format!("{prefix}{path}"),
            PathTransform::AddSuffix(suffix) => format!("{path}{suffix}"),
            PathTransform::Replace(replace) => replace
                .pattern
                .replace_all(path, replace.with.as_str())
                .into_owned(),
            PathTransform::Template(template) => template.render(path),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReplace {
    pattern: String,
    with: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawReplace")]
pub struct Replace {
    pattern: Regex,
    with: String,
}

impl TryFrom<RawReplace> for Replace {
    type Error = String;

    fn try_from(raw: RawReplace) -> Result<Self, Self::Error> {
        let pattern = Regex::new(&raw.pattern)
            .map_err(|e| format!("invalid replace pattern '{}': {e}", raw.pattern))?;
        Ok(Self {
            pattern,
            with: raw.with,
        })
    }
}

impl PartialEq for Replace {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_str() == other.pattern.as_str() && self.with == other.with
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Path,
    Dir,
    Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// A pre-parsed `${...}` template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Template {
    segments: Vec<Segment>,
}

impl TryFrom<String> for Template {
    type Error = String;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '$' {
                literal.push(ch);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    literal.push('$');
                }
                Some('{') => {
                    chars.next();
                    let name = consume_until(&mut chars, '}')
                        .ok_or_else(|| format!("unclosed placeholder in template '{source}'"))?;
                    let placeholder = match name.trim() {
                        "path" => Placeholder::Path,
                        "dir" => Placeholder::Dir,
                        "name" => Placeholder::Name,
                        other => return Err(format!("unknown template placeholder '{other}'")),
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(placeholder));
                }
                _ => literal.push('$'),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }
}

impl Template {
    fn render(&self, path: &str) -> String {
        let (dir, name) = match path.rfind('/') {
            Some(idx) => (&path[..idx], &path[idx + 1..]),
            None => ("", path),
        };

        let mut out = String::with_capacity(path.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(Placeholder::Path) => out.push_str(path),
                Segment::Placeholder(Placeholder::Dir) => out.push_str(dir),
                Segment::Placeholder(Placeholder::Name) => out.push_str(name),
            }
        }
        out
    }
}

fn consume_until(chars: &mut std::iter::Peekable<std::str::Chars>, delim: char) -> Option<String> {
    let mut result = String::new();
    for ch in chars.by_ref() {
        if ch == delim {
            return Some(result);
        }
        result.push(ch);
    }
    None
}

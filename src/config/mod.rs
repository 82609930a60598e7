//! Directory-scoped endpoint configuration declared by `.getafix` marker files.

mod error;
mod fragment;
mod index;
mod resolve;
mod transform;

pub use error::{ConfigError, ResolveError};
pub use fragment::{ConfigFragment, QueryValue};
pub use index::ConfigIndex;
pub use resolve::{resolve, ResolvedRequest};
pub use transform::PathTransform;

/// File name of the marker that scopes configuration to its directory.
pub const DEFAULT_MARKER: &str = ".getafix";

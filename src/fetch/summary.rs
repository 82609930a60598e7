use std::path::PathBuf;

use serde::Serialize;

/// A descriptor the server answered with a status of 300 or above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub file: PathBuf,
    pub url: String,
    pub code: u16,
}

/// A descriptor that could not be refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub file: PathBuf,
    pub url: Option<String>,
    pub error: String,
}

/// Terminal state of every item in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub succeeded: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
    pub failures: Vec<Failure>,
    /// Candidates with no marker file in their ancestry.
    pub not_governed: usize,
    /// Set when the run stopped at a unit boundary before finishing.
    pub cancelled: bool,
}

impl RunSummary {
    /// True when nothing failed and the run was not cancelled. Warnings do not count.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Number of items that reached a terminal state.
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.warnings.len() + self.failures.len()
    }
}

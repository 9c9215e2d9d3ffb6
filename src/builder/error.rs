//! Build errors for machines and their transition tables.

use crate::builder::validation::TableViolation;
use thiserror::Error;

/// Errors that can occur when building a machine.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Initial state not specified. Call .state(state) before .build()")]
    MissingState,

    #[error("No transitions defined. Call .transitions(table) or .transition(..)")]
    MissingTransitions,

    #[error("Transition table has {} violation(s): {}", .0.len(), render(.0))]
    InvalidTable(Vec<TableViolation>),

    #[error("Invalid machine configuration: {0}")]
    Config(String),
}

impl BuildError {
    /// Violations found in the transition table, if that is what failed.
    pub fn violations(&self) -> &[TableViolation] {
        match self {
            BuildError::InvalidTable(violations) => violations,
            _ => &[],
        }
    }
}

fn render(violations: &[TableViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for BuildError {
    fn from(error: serde_json::Error) -> Self {
        BuildError::Config(error.to_string())
    }
}

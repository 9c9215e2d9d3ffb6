//! Builder API for machine construction.
//!
//! This module provides the fluent [`MachineBuilder`], table validation and
//! the [`transitions!`](crate::transitions) macro for writing tables with
//! minimal boilerplate.

pub mod error;
pub mod machine;
pub mod macros;
pub mod validation;

pub use error::BuildError;
pub use machine::MachineBuilder;
pub use validation::TableViolation;

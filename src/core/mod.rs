//! Core value types of a machine.
//!
//! This module contains the data that flows through dispatch:
//! - The `State` record and how proposed next-state values are read
//! - Immutable, bounded transition history
//! - Identifier normalization for generated actions and predicates
//!
//! Nothing here touches a machine; it is all plain values and pure functions.

mod history;
pub mod naming;
mod state;

pub use history::{StateHistory, StateTransition};
pub use state::State;

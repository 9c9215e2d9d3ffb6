//! Structural checks on a transition table.
//!
//! Every check runs, and every violation is reported together, so a broken
//! table can be fixed in one pass.

use crate::core::naming::{action_identifier, predicate_identifier};
use crate::core::State;
use crate::machine::TransitionTable;
use std::collections::BTreeMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// A structural problem in a transition table.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TableViolation {
    #[error("initial state '{state}' is not declared in the transition table")]
    InitialStateUncovered { state: String },

    #[error("'{state}' --{action}--> '{target}': target state is not declared")]
    TargetUncovered {
        state: String,
        action: String,
        target: String,
    },

    #[error("actions '{first}' and '{second}' both normalize to '{identifier}'")]
    ActionCollision {
        identifier: String,
        first: String,
        second: String,
    },

    #[error("states '{first}' and '{second}' both generate predicate '{identifier}'")]
    PredicateCollision {
        identifier: String,
        first: String,
        second: String,
    },

    #[error("state names must contain at least one letter or digit")]
    EmptyStateName,

    #[error("state '{state}' has an action whose name normalizes to nothing")]
    EmptyActionName { state: String },
}

type Checked = Validation<(), NonEmptyVec<TableViolation>>;

/// Check `table` against the initial `state`.
///
/// # Example
///
/// ```rust
/// use machina::builder::validation::{validate, TableViolation};
/// use machina::core::State;
/// use machina::machine::TransitionTable;
/// use stillwater::validation::Validation;
///
/// let table = TransitionTable::new().with("idle", "run", "running");
///
/// match validate(&State::new("idle"), &table) {
///     Validation::Failure(errors) => {
///         assert!(errors
///             .iter()
///             .any(|e| matches!(e, TableViolation::TargetUncovered { .. })));
///     }
///     Validation::Success(_) => panic!("'running' is not declared"),
/// }
/// ```
pub fn validate(state: &State, table: &TransitionTable) -> Checked {
    let mut checks: Vec<Checked> = vec![initial_state_covered(state, table)];
    checks.extend(state_names(table));
    checks.extend(action_names(table));
    checks.extend(targets_covered(table));
    checks.extend(collisions(
        table.actions().into_iter(),
        action_identifier,
        |identifier, first, second| TableViolation::ActionCollision {
            identifier,
            first,
            second,
        },
    ));
    checks.extend(collisions(
        table.states(),
        predicate_identifier,
        |identifier, first, second| TableViolation::PredicateCollision {
            identifier,
            first,
            second,
        },
    ));

    Validation::all_vec(checks).map(|_| ())
}

fn initial_state_covered(state: &State, table: &TransitionTable) -> Checked {
    if table.contains_state(state.name()) {
        Validation::success(())
    } else {
        Validation::fail(TableViolation::InitialStateUncovered {
            state: state.name().to_string(),
        })
    }
}

fn state_names(table: &TransitionTable) -> Vec<Checked> {
    table
        .states()
        .filter(|state| action_identifier(state).is_empty())
        .map(|_| Validation::fail(TableViolation::EmptyStateName))
        .collect()
}

fn action_names(table: &TransitionTable) -> Vec<Checked> {
    table
        .iter()
        .filter(|(_, action, _)| action_identifier(action).is_empty())
        .map(|(state, _, _)| {
            Validation::fail(TableViolation::EmptyActionName {
                state: state.to_string(),
            })
        })
        .collect()
}

fn targets_covered(table: &TransitionTable) -> Vec<Checked> {
    table
        .iter()
        .filter_map(|(state, action, handler)| {
            let target = handler.target_name()?;
            (!table.contains_state(target)).then(|| {
                Validation::fail(TableViolation::TargetUncovered {
                    state: state.to_string(),
                    action: action.to_string(),
                    target: target.to_string(),
                })
            })
        })
        .collect()
}

fn collisions<'a>(
    names: impl Iterator<Item = &'a str>,
    normalize: fn(&str) -> String,
    violation: fn(String, String, String) -> TableViolation,
) -> Vec<Checked> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    let mut checks = Vec::new();
    for name in names {
        let identifier = normalize(name);
        match seen.get(identifier.as_str()) {
            Some(first) => checks.push(Validation::fail(violation(
                identifier,
                first.to_string(),
                name.to_string(),
            ))),
            None => {
                seen.insert(identifier, name);
            }
        }
    }
    checks
}

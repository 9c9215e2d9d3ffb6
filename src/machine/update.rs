//! The single place where a machine's state is replaced.

use crate::core::{State, StateTransition};
use crate::machine::{Machine, MachineError};
use crate::middleware::Event;
use chrono::Utc;
use serde_json::Value;
use tracing::debug;

/// Validate `proposal` and commit it as the machine's current state.
///
/// `null` leaves the state untouched. Anything else must read as a state
/// (see [`State::from_proposal`]) whose name is covered by the machine's
/// transition table.
pub fn commit(machine: &Machine, proposal: Value) -> Result<(), MachineError> {
    let next = match State::from_proposal(proposal) {
        Ok(Some(next)) => next,
        Ok(None) => return Ok(()),
        Err(value) => return Err(MachineError::WrongStateFormat { value }),
    };

    if !machine.transitions().contains_state(next.name()) {
        return Err(MachineError::UncoveredState {
            machine: machine.name().to_string(),
            state: next.name().to_string(),
        });
    }

    let current = machine.state();
    machine.notify(&Event::StateWillChange {
        current: &current,
        next: &next,
    });

    let previous = machine.replace_state(next.clone());
    debug!(
        machine = %machine.name(),
        from = previous.name(),
        to = next.name(),
        "state committed"
    );
    machine.record(StateTransition {
        from: previous.clone(),
        to: next.clone(),
        timestamp: Utc::now(),
    });

    machine.notify(&Event::StateChanged {
        previous: &previous,
        current: &next,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MachineBuilder;
    use serde_json::json;

    fn machine() -> Machine {
        MachineBuilder::new()
            .state(State::new("idle").with("bar", "zar"))
            .transition("idle", "run", "running")
            .transition("running", "stop", "idle")
            .track_history(10)
            .build()
            .unwrap()
    }

    #[test]
    fn commit_replaces_the_whole_state() {
        let machine = machine();
        commit(&machine, json!({ "name": "running", "speed": 3 })).unwrap();

        let state = machine.state();
        assert_eq!(state.name(), "running");
        assert_eq!(state.get("speed"), Some(&json!(3)));
        assert!(state.get("bar").is_none());
    }

    #[test]
    fn null_is_a_no_op() {
        let machine = machine();
        commit(&machine, Value::Null).unwrap();

        assert_eq!(machine.state(), State::new("idle").with("bar", "zar"));
        assert!(machine.history().is_some_and(|h| h.is_empty()));
    }

    #[test]
    fn uncovered_states_are_rejected() {
        let machine = machine();
        let error = commit(&machine, json!("flying")).unwrap_err();

        assert!(matches!(error, MachineError::UncoveredState { ref state, .. } if state == "flying"));
        assert!(machine.is("idle"));
    }

    #[test]
    fn malformed_states_are_rejected() {
        let machine = machine();
        let error = commit(&machine, json!({ "speed": 3 })).unwrap_err();

        assert_eq!(
            error,
            MachineError::WrongStateFormat {
                value: json!({ "speed": 3 })
            }
        );
    }

    #[test]
    fn commits_are_recorded() {
        let machine = machine();
        commit(&machine, json!("running")).unwrap();
        commit(&machine, json!("idle")).unwrap();

        let history = machine.history().unwrap();
        let names: Vec<&str> = history.get_path().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["idle", "running", "idle"]);
    }
}

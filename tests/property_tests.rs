//! Property-based tests for machines and identifier normalization.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use chrono::Utc;
use machina::core::naming::{action_identifier, predicate_identifier, to_camel_case};
use machina::{transitions, Machine, State, StateHistory, StateTransition};
use proptest::prelude::*;

fn runner() -> Machine {
    Machine::create(
        "idle",
        transitions! {
            "idle" => { "run" => "running" },
            "running" => { "stop" => "idle" },
        },
    )
    .unwrap()
}

prop_compose! {
    fn arbitrary_action()(run in any::<bool>()) -> &'static str {
        if run { "run" } else { "stop" }
    }
}

prop_compose! {
    fn arbitrary_state()(variant in 0..3u8, count in 0..100i64) -> State {
        let name = match variant {
            0 => "idle",
            1 => "running",
            _ => "done",
        };
        State::new(name).with("count", count)
    }
}

proptest! {
    #[test]
    fn identifiers_have_no_separators(name in "[a-z ._-]{0,24}") {
        let identifier = action_identifier(&name);
        prop_assert!(identifier.chars().all(|c| c.is_alphanumeric() || c == '_'));
    }

    #[test]
    fn camel_case_is_idempotent(name in "[a-zA-Z0-9 -]{0,24}") {
        let once = to_camel_case(&name);
        prop_assert_eq!(to_camel_case(&once), once.clone());
    }

    #[test]
    fn predicate_holds_only_for_the_current_state(actions in prop::collection::vec(arbitrary_action(), 0..20)) {
        let machine = runner();
        for action in actions {
            machine.call_action(action, vec![]).unwrap();
            let name = machine.state().name().to_string();
            for state in ["idle", "running"] {
                prop_assert_eq!(
                    machine.check(&predicate_identifier(state)),
                    Some(name == state)
                );
            }
        }
    }

    #[test]
    fn run_then_stop_returns_to_idle(rounds in 1..30usize) {
        let machine = runner();
        for _ in 0..rounds {
            machine.call_action("run", vec![]).unwrap();
            prop_assert!(machine.is("running"));
            machine.call_action("stop", vec![]).unwrap();
            prop_assert!(machine.is("idle"));
        }
    }

    #[test]
    fn independent_machines_never_share_state(actions in prop::collection::vec(arbitrary_action(), 0..20)) {
        let (first, second) = (runner(), runner());
        for action in actions {
            first.call_action(action, vec![]).unwrap();
        }
        prop_assert!(second.is("idle"));
    }

    #[test]
    fn history_never_exceeds_its_limit(
        limit in 1..8usize,
        states in prop::collection::vec(arbitrary_state(), 1..20),
    ) {
        let mut history = StateHistory::with_limit(limit);
        for pair in states.windows(2) {
            history = history.record(StateTransition {
                from: pair[0].clone(),
                to: pair[1].clone(),
                timestamp: Utc::now(),
            });
        }
        prop_assert!(history.len() <= limit);
        prop_assert_eq!(history.len(), (states.len() - 1).min(limit));
    }

    #[test]
    fn states_round_trip_through_proposals(state in arbitrary_state()) {
        let proposed = State::from_proposal(state.clone().into_value());
        prop_assert_eq!(proposed, Ok(Some(state)));
    }
}

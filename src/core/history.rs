//! State transition history tracking.
//!
//! Machines built with `track_history` keep an immutable log of every
//! committed transition. The log is bounded: once it reaches its limit the
//! oldest entries are dropped.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single committed transition.
///
/// # Example
///
/// ```rust
/// use machina::core::{State, StateTransition};
/// use chrono::Utc;
///
/// let transition = StateTransition {
///     from: State::new("idle"),
///     to: State::new("running"),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(transition.to.name(), "running");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state being replaced
    pub from: State,
    /// The state committed in its place
    pub to: State,
    /// When the commit happened
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded history of committed transitions.
///
/// History is immutable - `record` returns a new history with the
/// transition added.
///
/// # Example
///
/// ```rust
/// use machina::core::{State, StateHistory, StateTransition};
/// use chrono::Utc;
///
/// let history = StateHistory::with_limit(8);
///
/// let history = history.record(StateTransition {
///     from: State::new("idle"),
///     to: State::new("running"),
///     timestamp: Utc::now(),
/// });
/// let history = history.record(StateTransition {
///     from: State::new("running"),
///     to: State::new("idle"),
///     timestamp: Utc::now(),
/// });
///
/// let names: Vec<&str> = history.get_path().iter().map(|s| s.name()).collect();
/// assert_eq!(names, ["idle", "running", "idle"]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StateHistory {
    transitions: Vec<StateTransition>,
    limit: Option<usize>,
}

impl StateHistory {
    /// Create an empty, unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty history that keeps at most `limit` transitions.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// When the limit is reached the oldest transitions are dropped.
    pub fn record(&self, transition: StateTransition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        if let Some(limit) = self.limit {
            let excess = transitions.len().saturating_sub(limit);
            transitions.drain(..excess);
        }
        Self {
            transitions,
            limit: self.limit,
        }
    }

    /// Get the path of states traversed: the `from` of the oldest kept
    /// transition, then the `to` of each transition.
    pub fn get_path(&self) -> Vec<&State> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(&first.from);
        }
        for transition in &self.transitions {
            path.push(&transition.to);
        }
        path
    }

    /// Time between the first and last kept transitions.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// All kept transitions, oldest first.
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(from: &str, to: &str) -> StateTransition {
        StateTransition {
            from: State::new(from),
            to: State::new(to),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_history_is_empty() {
        let history = StateHistory::new();
        assert!(history.is_empty());
        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn record_is_immutable() {
        let history = StateHistory::new();
        let new_history = history.record(transition("idle", "running"));

        assert_eq!(history.len(), 0);
        assert_eq!(new_history.len(), 1);
    }

    #[test]
    fn get_path_returns_state_sequence() {
        let history = StateHistory::new()
            .record(transition("idle", "running"))
            .record(transition("running", "done"));

        let path = history.get_path();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].name(), "idle");
        assert_eq!(path[1].name(), "running");
        assert_eq!(path[2].name(), "done");
    }

    #[test]
    fn limit_drops_oldest_transitions() {
        let history = StateHistory::with_limit(2)
            .record(transition("a", "b"))
            .record(transition("b", "c"))
            .record(transition("c", "d"));

        assert_eq!(history.len(), 2);
        let names: Vec<&str> = history.get_path().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["b", "c", "d"]);
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let history = StateHistory::with_limit(0).record(transition("a", "b"));
        assert!(history.is_empty());
    }

    #[test]
    fn duration_calculates_elapsed_time() {
        let start = Utc::now();
        let history = StateHistory::new()
            .record(StateTransition {
                timestamp: start,
                ..transition("a", "b")
            })
            .record(StateTransition {
                timestamp: start + chrono::Duration::milliseconds(10),
                ..transition("b", "c")
            });

        assert_eq!(history.duration(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn history_serializes_correctly() {
        let history = StateHistory::with_limit(4).record(transition("idle", "running"));

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: StateHistory = serde_json::from_str(&json).unwrap();

        assert_eq!(history.transitions(), deserialized.transitions());
    }
}

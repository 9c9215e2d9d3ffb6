//! Transition handlers and the table that maps them to states.

use crate::core::State;
use crate::effects::{Co, Coroutine, EffectError};
use crate::machine::Machine;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Synchronous handler: computes the proposed next state.
pub type HandlerFn = Rc<dyn Fn(&Machine, &State, &[Value]) -> Result<Value, EffectError>>;

/// Coroutine handler: builds the coroutine to drive for one dispatch.
pub type CoroutineFactory = Rc<dyn Fn(&Machine, &State, Vec<Value>) -> Coroutine>;

/// Logic attached to a (state, action) pair.
#[derive(Clone)]
pub enum Handler {
    /// Move to the named state, dropping the current payload.
    Target(String),
    /// Compute the next state synchronously.
    Func(HandlerFn),
    /// Run a coroutine that may perform effects before settling.
    Coroutine(CoroutineFactory),
}

impl Handler {
    pub fn target(name: impl Into<String>) -> Self {
        Handler::Target(name.into())
    }

    /// Wrap a synchronous handler.
    ///
    /// The handler gets the machine, the current state and the dispatch
    /// arguments, and returns the proposed next state: `Value::Null` to keep
    /// the current one, a name, a [`State`], or a JSON object with a `name`.
    ///
    /// ```rust
    /// use machina::machine::Handler;
    /// use serde_json::json;
    ///
    /// let handler = Handler::func(|_machine, _state, args| {
    ///     Ok(json!({ "name": "running", "data": args }))
    /// });
    /// assert_eq!(handler.kind(), "func");
    /// ```
    pub fn func<F, O>(handler: F) -> Self
    where
        F: Fn(&Machine, &State, &[Value]) -> Result<O, EffectError> + 'static,
        O: Into<Value>,
    {
        Handler::Func(Rc::new(
            move |machine: &Machine, state: &State, args: &[Value]| -> Result<Value, EffectError> {
                handler(machine, state, args).map(Into::into)
            },
        ))
    }

    /// Wrap a coroutine handler.
    ///
    /// The body receives the yield handle, the machine, a snapshot of the
    /// state at dispatch time, and the dispatch arguments. Its return value
    /// is committed as the final state.
    ///
    /// ```rust
    /// use machina::effects::call;
    /// use machina::machine::Handler;
    /// use serde_json::json;
    ///
    /// let handler = Handler::coroutine(|co, _machine, _state, args| async move {
    ///     co.update("loading").await;
    ///     let user = co.call(call(|_m, a| json!({ "id": a[0] }), args)).await?;
    ///     Ok(json!({ "name": "loaded", "user": user }))
    /// });
    /// assert_eq!(handler.kind(), "coroutine");
    /// ```
    pub fn coroutine<F, Fut>(body: F) -> Self
    where
        F: Fn(Co, Machine, State, Vec<Value>) -> Fut + 'static,
        Fut: Future<Output = Result<Value, EffectError>> + 'static,
    {
        Handler::Coroutine(Rc::new(
            move |machine: &Machine, state: &State, args: Vec<Value>| -> Coroutine {
                let machine = machine.clone();
                let state = state.clone();
                Coroutine::new(|co| body(co, machine, state, args))
            },
        ))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Handler::Target(_) => "target",
            Handler::Func(_) => "func",
            Handler::Coroutine(_) => "coroutine",
        }
    }

    /// The target state of a declarative handler.
    pub fn target_name(&self) -> Option<&str> {
        match self {
            Handler::Target(name) => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for Handler {
    fn from(target: &str) -> Self {
        Handler::target(target)
    }
}

impl From<String> for Handler {
    fn from(target: String) -> Self {
        Handler::Target(target)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Target(name) => f.debug_tuple("Target").field(name).finish(),
            Handler::Func(_) => f.write_str("Func(..)"),
            Handler::Coroutine(_) => f.write_str("Coroutine(..)"),
        }
    }
}

/// State name → action name → handler.
///
/// Assembled before a machine is built and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct TransitionTable {
    states: BTreeMap<String, BTreeMap<String, Handler>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a state, even if it has no outgoing actions.
    pub fn declare(&mut self, state: impl Into<String>) {
        self.states.entry(state.into()).or_default();
    }

    /// Attach a handler to an action of a state, declaring the state.
    pub fn insert(
        &mut self,
        state: impl Into<String>,
        action: impl Into<String>,
        handler: impl Into<Handler>,
    ) {
        self.states
            .entry(state.into())
            .or_default()
            .insert(action.into(), handler.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(
        mut self,
        state: impl Into<String>,
        action: impl Into<String>,
        handler: impl Into<Handler>,
    ) -> Self {
        self.insert(state, action, handler);
        self
    }

    pub fn handler(&self, state: &str, action: &str) -> Option<&Handler> {
        self.states.get(state)?.get(action)
    }

    pub fn contains_state(&self, state: &str) -> bool {
        self.states.contains_key(state)
    }

    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Distinct action names across all states.
    pub fn actions(&self) -> BTreeSet<&str> {
        self.states
            .values()
            .flat_map(|actions| actions.keys().map(String::as_str))
            .collect()
    }

    /// Every (state, action, handler) entry.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Handler)> {
        self.states.iter().flat_map(|(state, actions)| {
            actions
                .iter()
                .map(move |(action, handler)| (state.as_str(), action.as_str(), handler))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl From<BTreeMap<String, BTreeMap<String, String>>> for TransitionTable {
    fn from(declarative: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        let mut table = Self::new();
        for (state, actions) in declarative {
            table.declare(state.clone());
            for (action, target) in actions {
                table.insert(state.clone(), action, target);
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn declarative_handlers_from_strings() {
        let handler = Handler::from("running");
        assert_eq!(handler.kind(), "target");
        assert_eq!(handler.target_name(), Some("running"));
        assert!(Handler::func(|_m, _s, _a| Ok(Value::Null)).target_name().is_none());
    }

    #[test]
    fn table_lookup() {
        let table = TransitionTable::new()
            .with("idle", "run", "running")
            .with("running", "stop", "idle");

        assert!(table.handler("idle", "run").is_some());
        assert!(table.handler("idle", "stop").is_none());
        assert!(table.handler("missing", "run").is_none());
        assert!(table.contains_state("running"));
        assert!(!table.contains_state("done"));
    }

    #[test]
    fn from_declarative_map() {
        let map: BTreeMap<String, BTreeMap<String, String>> =
            serde_json::from_value(json!({ "idle": { "run": "running" }, "running": {} })).unwrap();
        let table = TransitionTable::from(map);

        assert!(table.contains_state("running"));
        assert_eq!(
            table.handler("idle", "run").and_then(Handler::target_name),
            Some("running")
        );
    }
}

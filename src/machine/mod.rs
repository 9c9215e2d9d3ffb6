//! The machine: current state, transition table and the dispatch surface.
//!
//! A [`Machine`] is a cheap, cloneable handle; clones share the same
//! machine. Everything runs on one thread: machines are neither `Send` nor
//! `Sync`.
//!
//! # Example
//!
//! ```rust
//! use machina::machine::Machine;
//! use machina::transitions;
//!
//! let machine = Machine::create(
//!     "idle",
//!     transitions! {
//!         "idle" => { "run" => "running" },
//!         "running" => { "stop" => "idle" },
//!     },
//! )
//! .unwrap();
//!
//! machine.call_action("run", vec![]).unwrap();
//! assert!(machine.is("running"));
//! assert_eq!(machine.check("isRunning"), Some(true));
//! ```

mod dispatch;
mod error;
mod transition;
pub(crate) mod update;

pub use dispatch::Dispatched;
pub use error::MachineError;
pub use transition::{CoroutineFactory, Handler, HandlerFn, TransitionTable};

use crate::builder::{BuildError, MachineBuilder};
use crate::core::naming::{action_identifier, predicate_identifier};
use crate::core::{State, StateHistory, StateTransition};
use crate::effects::EffectError;
use crate::middleware::{Event, MiddlewareNotifier};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Custom method attached at construction. Receives the machine explicitly.
pub type CustomMethod = Rc<dyn Fn(&Machine, Vec<Value>) -> Result<Value, EffectError>>;

/// Dispatch closure registered for one action name.
pub type ActionFn = Rc<dyn Fn(&Machine, Vec<Value>) -> Result<Dispatched, MachineError>>;

/// A running state machine.
#[derive(Clone)]
pub struct Machine {
    inner: Rc<Inner>,
}

struct Inner {
    name: String,
    state: RefCell<State>,
    transitions: TransitionTable,
    actions: BTreeMap<String, ActionFn>,
    predicates: BTreeMap<String, String>,
    methods: BTreeMap<String, CustomMethod>,
    notifier: MiddlewareNotifier,
    history: RefCell<Option<StateHistory>>,
}

/// Everything a machine is assembled from, validated by the builder.
pub(crate) struct Parts {
    pub name: String,
    pub state: State,
    pub transitions: TransitionTable,
    pub methods: BTreeMap<String, CustomMethod>,
    pub notifier: MiddlewareNotifier,
    pub history_limit: Option<usize>,
}

impl Machine {
    /// Two-argument short form: initial state and transitions, nothing else.
    pub fn create(
        state: impl Into<State>,
        transitions: TransitionTable,
    ) -> Result<Machine, BuildError> {
        MachineBuilder::new()
            .state(state)
            .transitions(transitions)
            .build()
    }

    pub(crate) fn assemble(parts: Parts) -> Machine {
        let actions = parts
            .transitions
            .actions()
            .into_iter()
            .map(|action| {
                let name = action.to_string();
                let dispatch: ActionFn = Rc::new(move |machine: &Machine, args: Vec<Value>| {
                    machine.dispatch(&name, args)
                });
                (action_identifier(action), dispatch)
            })
            .collect();

        let predicates = parts
            .transitions
            .states()
            .map(|state| (predicate_identifier(state), state.to_string()))
            .collect();

        Machine {
            inner: Rc::new(Inner {
                name: parts.name,
                state: RefCell::new(parts.state),
                transitions: parts.transitions,
                actions,
                predicates,
                methods: parts.methods,
                notifier: parts.notifier,
                history: RefCell::new(parts.history_limit.map(StateHistory::with_limit)),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> State {
        self.inner.state.borrow().clone()
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.inner.transitions
    }

    /// Dispatch an action by its name as written in the transition table.
    pub fn dispatch(&self, action: &str, args: Vec<Value>) -> Result<Dispatched, MachineError> {
        dispatch::dispatch(self, action, args)
    }

    /// Dispatch an action by its normalized identifier, e.g. `runBabyRun`
    /// for `"run baby run"`.
    pub fn call_action(
        &self,
        identifier: &str,
        args: Vec<Value>,
    ) -> Result<Dispatched, MachineError> {
        let action = self
            .inner
            .actions
            .get(identifier)
            .cloned()
            .ok_or_else(|| MachineError::UnknownAction {
                machine: self.name().to_string(),
                identifier: identifier.to_string(),
            })?;
        action(self, args)
    }

    /// Normalized identifiers of every action in the table.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.inner.actions.keys().map(String::as_str)
    }

    /// Whether the machine is currently in `state`.
    pub fn is(&self, state: &str) -> bool {
        self.inner.state.borrow().is(state)
    }

    /// Evaluate a generated predicate such as `isIdle`.
    ///
    /// Returns `None` if no state generated that predicate.
    pub fn check(&self, predicate: &str) -> Option<bool> {
        let state = self.inner.predicates.get(predicate)?;
        Some(self.is(state))
    }

    /// Identifiers of every generated predicate.
    pub fn predicates(&self) -> impl Iterator<Item = &str> {
        self.inner.predicates.keys().map(String::as_str)
    }

    /// Invoke a custom method with this machine as its context.
    pub fn call_method(&self, method: &str, args: Vec<Value>) -> Result<Value, MachineError> {
        let custom = self
            .inner
            .methods
            .get(method)
            .cloned()
            .ok_or_else(|| MachineError::UnknownMethod {
                machine: self.name().to_string(),
                method: method.to_string(),
            })?;
        Ok(custom(self, args)?)
    }

    /// Committed transitions, if the machine tracks history.
    pub fn history(&self) -> Option<StateHistory> {
        self.inner.history.borrow().clone()
    }

    pub(crate) fn notify(&self, event: &Event<'_>) {
        self.inner.notifier.notify(self, event);
    }

    pub(crate) fn replace_state(&self, next: State) -> State {
        self.inner.state.replace(next)
    }

    pub(crate) fn record(&self, transition: StateTransition) {
        let mut history = self.inner.history.borrow_mut();
        if let Some(current) = history.take() {
            *history = Some(current.record(transition));
        }
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.inner.name)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

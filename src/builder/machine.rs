//! Builder for constructing machines.

use crate::builder::error::BuildError;
use crate::builder::validation::validate;
use crate::core::State;
use crate::effects::EffectError;
use crate::machine::{CustomMethod, Handler, Machine, Parts, TransitionTable};
use crate::middleware::{Event, Middleware, MiddlewareNotifier};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::rc::Rc;
use stillwater::validation::Validation;
use tracing::debug;
use uuid::Uuid;

/// Fluent builder for a [`Machine`].
///
/// The builder is cheap to clone, and every `build` produces an independent
/// machine with its own state.
///
/// # Example
///
/// ```rust
/// use machina::builder::MachineBuilder;
/// use machina::machine::Handler;
/// use serde_json::json;
///
/// let machine = MachineBuilder::new()
///     .name("door")
///     .state("closed")
///     .transition("closed", "open", "opened")
///     .transition("opened", "close", "closed")
///     .transition(
///         "opened",
///         "paint",
///         Handler::func(|_m, _s, args| Ok(json!({ "name": "opened", "color": args[0] }))),
///     )
///     .build()
///     .unwrap();
///
/// machine.call_action("open", vec![]).unwrap();
/// machine.call_action("paint", vec![json!("red")]).unwrap();
/// assert_eq!(machine.state().get("color"), Some(&json!("red")));
/// ```
#[derive(Clone, Default)]
pub struct MachineBuilder {
    name: Option<String>,
    state: Option<State>,
    transitions: Option<TransitionTable>,
    methods: BTreeMap<String, CustomMethod>,
    notifier: MiddlewareNotifier,
    history_limit: Option<usize>,
}

impl MachineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the machine. Unnamed machines get a generated `machine-<uuid>`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the initial state (required).
    pub fn state(mut self, state: impl Into<State>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Replace the whole transition table.
    pub fn transitions(mut self, transitions: TransitionTable) -> Self {
        self.transitions = Some(transitions);
        self
    }

    /// Attach one handler to an action of a state.
    pub fn transition(
        mut self,
        state: impl Into<String>,
        action: impl Into<String>,
        handler: impl Into<Handler>,
    ) -> Self {
        self.transitions
            .get_or_insert_with(TransitionTable::new)
            .insert(state, action, handler);
        self
    }

    /// Declare a state without outgoing actions.
    pub fn declare(mut self, state: impl Into<String>) -> Self {
        self.transitions
            .get_or_insert_with(TransitionTable::new)
            .declare(state);
        self
    }

    /// Attach a custom method, callable through [`Machine::call_method`].
    pub fn method<F, O>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Machine, Vec<Value>) -> Result<O, EffectError> + 'static,
        O: Into<Value>,
    {
        let method: CustomMethod = Rc::new(
            move |machine: &Machine, args: Vec<Value>| -> Result<Value, EffectError> {
                method(machine, args).map(Into::into)
            },
        );
        self.methods.insert(name.into(), method);
        self
    }

    /// Subscribe a closure to lifecycle events.
    pub fn on_event<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Machine, &Event<'_>) + 'static,
    {
        self.notifier.subscribe_fn(observer);
        self
    }

    /// Subscribe a middleware to lifecycle events.
    pub fn middleware(mut self, middleware: Rc<dyn Middleware>) -> Self {
        self.notifier.subscribe(middleware);
        self
    }

    /// Record committed transitions, keeping at most `limit` of them.
    pub fn track_history(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Build the machine.
    ///
    /// Returns an error if the state or the transitions are missing, or if
    /// the table fails validation. All table violations are reported at once.
    pub fn build(self) -> Result<Machine, BuildError> {
        let state = self.state.ok_or(BuildError::MissingState)?;
        let transitions = self.transitions.ok_or(BuildError::MissingTransitions)?;

        if let Validation::Failure(violations) = validate(&state, &transitions) {
            return Err(BuildError::InvalidTable(
                violations.iter().cloned().collect(),
            ));
        }

        let name = self
            .name
            .unwrap_or_else(|| format!("machine-{}", Uuid::new_v4()));

        let machine = Machine::assemble(Parts {
            name,
            state,
            transitions,
            methods: self.methods,
            notifier: self.notifier,
            history_limit: self.history_limit,
        });

        debug!(machine = %machine.name(), state = machine.state().name(), "machine created");
        machine.notify(&Event::MachineCreated);
        Ok(machine)
    }

    /// Start a builder from a JSON description of a declarative machine.
    ///
    /// The document may carry `name`, `state` (a name or a full state
    /// object), `transitions` (state → action → target state) and
    /// `history` (a history limit). Handlers and methods can be added to the
    /// returned builder before building.
    ///
    /// ```rust
    /// use machina::builder::MachineBuilder;
    ///
    /// let machine = MachineBuilder::from_json(
    ///     r#"{
    ///         "name": "light",
    ///         "state": { "name": "off", "watts": 40 },
    ///         "transitions": { "off": { "flip": "on" }, "on": { "flip": "off" } }
    ///     }"#,
    /// )
    /// .unwrap()
    /// .build()
    /// .unwrap();
    ///
    /// machine.call_action("flip", vec![]).unwrap();
    /// assert!(machine.is("on"));
    /// ```
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        let config: MachineConfig = serde_json::from_str(json)?;

        let mut builder = Self::new();
        builder.name = config.name;
        builder.state = config.state.map(StateConfig::into_state);
        builder.transitions = config.transitions.map(TransitionTable::from);
        builder.history_limit = config.history;
        Ok(builder)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MachineConfig {
    name: Option<String>,
    state: Option<StateConfig>,
    transitions: Option<BTreeMap<String, BTreeMap<String, String>>>,
    history: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StateConfig {
    Name(String),
    Full(State),
}

impl StateConfig {
    fn into_state(self) -> State {
        match self {
            StateConfig::Name(name) => State::new(name),
            StateConfig::Full(state) => state,
        }
    }
}

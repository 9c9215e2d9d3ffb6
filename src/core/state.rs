//! The state record carried by every machine.
//!
//! A state is an immutable value: a required `name` that selects the row of
//! the transition table, plus arbitrary payload fields. Machines replace
//! their state on every committed transition and never mutate it in place.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current position of a machine, with its payload.
///
/// Serializes flat, so `State::new("running").with("speed", 3)` becomes
/// `{"name": "running", "speed": 3}`.
///
/// # Example
///
/// ```rust
/// use machina::core::State;
/// use serde_json::json;
///
/// let state = State::new("running").with("data", json!(["a", "b"]));
///
/// assert_eq!(state.name(), "running");
/// assert_eq!(state.get("data"), Some(&json!(["a", "b"])));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct State {
    name: String,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl State {
    /// Create a state with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Map::new(),
        }
    }

    /// Return a copy of this state with `key` set to `value`.
    ///
    /// Setting `"name"` to a string renames the state; any other value
    /// for `"name"` is ignored.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        if key == "name" {
            if let Value::String(name) = value {
                self.name = name;
            }
        } else {
            self.payload.insert(key, value);
        }
        self
    }

    /// The state's name, the key into the transition table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// All payload fields, without the name.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Check whether this state has the given name.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Interpret a proposed next-state value.
    ///
    /// `null` means "no change" and yields `Ok(None)`. Strings and numbers
    /// are shorthand for a state with that name and no payload. Objects
    /// must carry a string `name`.
    pub fn from_proposal(proposal: Value) -> Result<Option<Self>, Value> {
        match proposal {
            Value::Null => Ok(None),
            Value::String(name) => Ok(Some(Self::new(name))),
            Value::Number(number) => Ok(Some(Self::new(number.to_string()))),
            Value::Object(_) => serde_json::from_value(proposal.clone())
                .map(Some)
                .map_err(|_| proposal),
            other => Err(other),
        }
    }

    /// Convert into the flat JSON form.
    pub fn into_value(self) -> Value {
        let mut object = self.payload;
        object.insert("name".to_string(), Value::String(self.name));
        Value::Object(object)
    }
}

impl From<&str> for State {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for State {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<State> for Value {
    fn from(state: State) -> Self {
        state.into_value()
    }
}

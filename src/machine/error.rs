//! Errors raised while dispatching actions and committing states.

use crate::effects::EffectError;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur on a built machine.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MachineError {
    #[error("Machine '{machine}' has no action '{identifier}'")]
    UnknownAction { machine: String, identifier: String },

    #[error("Machine '{machine}' has no method '{method}'")]
    UnknownMethod { machine: String, method: String },

    #[error("State '{state}' is not covered by the transitions of machine '{machine}'")]
    UncoveredState { machine: String, state: String },

    #[error("Wrong state format: {value}. Expected null, a name, or an object with a string 'name'")]
    WrongStateFormat { value: Value },

    #[error("Handler failed: {0}")]
    Handler(#[from] EffectError),

    #[error("Coroutine awaited something other than its yield handle")]
    CoroutineStalled,
}

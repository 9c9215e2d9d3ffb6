//! Resolves dispatched actions to handlers and runs them.

use crate::effects::interpreter::{self, DriveHandle};
use crate::machine::transition::Handler;
use crate::machine::{update, Machine, MachineError};
use crate::middleware::Event;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// What a dispatch did.
#[derive(Clone)]
pub enum Dispatched {
    /// The current state does not handle the action; nothing changed.
    Ignored,
    /// A declarative or functional handler ran and its result was committed.
    Committed,
    /// A coroutine handler is being driven; its final state is committed when
    /// it completes.
    Driving(DriveHandle),
}

impl Dispatched {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Dispatched::Ignored)
    }

    /// The drive started by a coroutine handler.
    pub fn drive(&self) -> Option<&DriveHandle> {
        match self {
            Dispatched::Driving(handle) => Some(handle),
            _ => None,
        }
    }
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatched::Ignored => f.write_str("Ignored"),
            Dispatched::Committed => f.write_str("Committed"),
            Dispatched::Driving(handle) => f
                .debug_struct("Driving")
                .field("finished", &handle.is_finished())
                .field("canceled", &handle.is_canceled())
                .finish(),
        }
    }
}

/// Run `action` against the machine's current state.
pub(crate) fn dispatch(
    machine: &Machine,
    action: &str,
    args: Vec<Value>,
) -> Result<Dispatched, MachineError> {
    let state = machine.state();
    let Some(handler) = machine.transitions().handler(state.name(), action).cloned() else {
        debug!(
            machine = %machine.name(),
            state = state.name(),
            action,
            "action not handled in current state"
        );
        return Ok(Dispatched::Ignored);
    };

    debug!(machine = %machine.name(), state = state.name(), action, handler = handler.kind(), "dispatching");
    machine.notify(&Event::ActionDispatched {
        action,
        args: &args,
    });

    match handler {
        Handler::Target(target) => {
            update::commit(machine, Value::String(target))?;
            processed(machine, action, &args);
            Ok(Dispatched::Committed)
        }
        Handler::Func(handler) => {
            let next = handler(machine, &state, &args)?;
            update::commit(machine, next)?;
            processed(machine, action, &args);
            Ok(Dispatched::Committed)
        }
        Handler::Coroutine(factory) => {
            let coroutine = factory(machine, &state, args.clone());
            let owner = machine.clone();
            let action = action.to_string();
            let handle = interpreter::drive(machine, coroutine, move |value| {
                update::commit(&owner, value)?;
                processed(&owner, &action, &args);
                Ok(())
            })?;
            Ok(Dispatched::Driving(handle))
        }
    }
}

fn processed(machine: &Machine, action: &str, args: &[Value]) {
    machine.notify(&Event::ActionProcessed { action, args });
}

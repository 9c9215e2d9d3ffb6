//! Machina: coroutine-driven finite state machines
//!
//! A machine holds one current state, a transition table keyed by state name
//! and action name, and a set of generated operations: one dispatch function
//! per action and one `isX` predicate per state.
//!
//! Handlers come in three kinds:
//!
//! - **Declarative**: a target state name
//! - **Functional**: a synchronous function returning the next state
//! - **Coroutine**: an async body that yields effects and intermediate
//!   states, driven by the interpreter until it returns the final state
//!
//! Effects are described, not performed, by handlers. The interpreter
//! performs them with the machine as context and resumes the coroutine with
//! the result, or with the error.
//!
//! # Example
//!
//! ```rust
//! use machina::{transitions, Handler, MachineBuilder};
//! use serde_json::json;
//!
//! let machine = MachineBuilder::new()
//!     .state("idle")
//!     .transitions(transitions! {
//!         "idle" => {
//!             "run" => "running",
//!             "run baby run" => Handler::func(|_m, _s, args| {
//!                 Ok(json!({ "name": "running", "data": args }))
//!             }),
//!         },
//!         "running" => { "stop" => "idle" },
//!     })
//!     .build()
//!     .unwrap();
//!
//! machine.call_action("runBabyRun", vec![json!(42)]).unwrap();
//! assert_eq!(machine.check("isRunning"), Some(true));
//! assert_eq!(machine.state().get("data"), Some(&json!([42])));
//! ```

pub mod builder;
pub mod core;
pub mod effects;
pub mod machine;
pub mod middleware;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder, TableViolation};
pub use core::{State, StateHistory, StateTransition};
pub use effects::{call, named_call, Co, DriveHandle, Effect, EffectError, Outcome};
pub use machine::{Dispatched, Handler, Machine, MachineError, TransitionTable};
pub use middleware::{Event, EventKind, Middleware};

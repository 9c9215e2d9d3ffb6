//! Effects, coroutines and the interpreter that drives them.
//!
//! Coroutine handlers describe side effects instead of performing them: they
//! yield [`Effect`] values and intermediate states through a [`Co`] handle,
//! and the [`interpreter`] performs the work and resumes them with the
//! result.
//!
//! # Key Concepts
//!
//! - **Effects**: a described call, invoked by the interpreter with the
//!   machine as context
//! - **Outcomes**: what an effect produced, either a ready value, a future or
//!   a nested coroutine
//! - **Coroutines**: resumable async bodies, stepped one yield at a time
//!
//! # Example
//!
//! ```rust
//! use machina::effects::{call, Coroutine, Progress, Resume, Yielded};
//! use serde_json::json;
//!
//! let mut coroutine = Coroutine::new(|co| async move {
//!     let sum = co.call(call(|_m, args| json!(args.len()), vec![json!(1)])).await?;
//!     Ok(json!({ "name": "done", "sum": sum }))
//! });
//!
//! match coroutine.resume(Resume::Empty) {
//!     Progress::Yielded(Yielded::Effect(effect)) => assert_eq!(effect.args(), &[json!(1)]),
//!     other => panic!("expected an effect, got {other:?}"),
//! }
//! match coroutine.resume(Resume::Value(json!(1))) {
//!     Progress::Complete(Ok(state)) => assert_eq!(state["sum"], json!(1)),
//!     other => panic!("expected completion, got {other:?}"),
//! }
//! ```

pub mod coroutine;
mod effect;
pub mod interpreter;

pub use coroutine::{Co, Coroutine, Progress};
pub use effect::{call, named_call, CallFn, Effect, EffectError, Outcome, Resume, Yielded};
pub use interpreter::{drive, Completion, DriveHandle};

//! Effect descriptors and the classification of their results.

use crate::effects::coroutine::Coroutine;
use crate::machine::Machine;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Failure raised by an effect, a handler or a coroutine body.
///
/// Effect failures are injected back into the coroutine that requested the
/// effect, where `co.call(..).await` returns them as `Err`.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct EffectError {
    message: String,
    detail: Option<Value>,
}

impl EffectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    /// Attach structured data to the error.
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&Value> {
        self.detail.as_ref()
    }
}

/// Function behind a `Call` effect. Receives the machine as context.
pub type CallFn = Rc<dyn Fn(&Machine, Vec<Value>) -> Outcome>;

/// Descriptor of an invocation a coroutine wants performed on its behalf.
#[derive(Clone)]
pub enum Effect {
    /// Invoke `func` with `args` and resume with its result.
    Call {
        name: String,
        func: CallFn,
        args: Vec<Value>,
    },
}

impl Effect {
    /// Name of the invoked function, for logs and middleware.
    pub fn name(&self) -> &str {
        match self {
            Effect::Call { name, .. } => name,
        }
    }

    pub fn args(&self) -> &[Value] {
        match self {
            Effect::Call { args, .. } => args,
        }
    }

    pub(crate) fn invoke(self, machine: &Machine) -> Outcome {
        match self {
            Effect::Call { func, args, .. } => func(machine, args),
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Call { name, args, .. } => f
                .debug_struct("Call")
                .field("name", name)
                .field("args", args)
                .finish(),
        }
    }
}

/// Build a `Call` effect.
///
/// The function may return anything convertible into an [`Outcome`]: a plain
/// `Value`, a `Result<Value, EffectError>`, a [`Coroutine`], or an
/// `Outcome` built explicitly (e.g. with [`Outcome::future`]).
///
/// ```rust
/// use machina::effects::{call, Outcome};
/// use serde_json::json;
///
/// let double = call(
///     |_machine, args| json!(args[0].as_i64().unwrap_or(0) * 2),
///     vec![json!(21)],
/// );
/// assert_eq!(double.args(), &[json!(21)]);
///
/// let later = call(|_machine, _args| Outcome::future(async { Ok(json!("ok")) }), vec![]);
/// # let _ = later;
/// ```
pub fn call<F, O>(func: F, args: Vec<Value>) -> Effect
where
    F: Fn(&Machine, Vec<Value>) -> O + 'static,
    O: Into<Outcome>,
{
    named_call(std::any::type_name::<F>(), func, args)
}

/// Build a `Call` effect with an explicit name.
pub fn named_call<F, O>(name: impl Into<String>, func: F, args: Vec<Value>) -> Effect
where
    F: Fn(&Machine, Vec<Value>) -> O + 'static,
    O: Into<Outcome>,
{
    Effect::Call {
        name: name.into(),
        func: Rc::new(move |machine: &Machine, args: Vec<Value>| -> Outcome {
            func(machine, args).into()
        }),
        args,
    }
}

/// Result of invoking an effect function.
pub enum Outcome {
    /// Settled synchronously, with a value or a thrown error.
    Ready(Result<Value, EffectError>),
    /// Settles later; the drive suspends until it does.
    Future(LocalBoxFuture<'static, Result<Value, EffectError>>),
    /// A nested coroutine, driven to completion before the caller resumes.
    Coroutine(Coroutine),
}

impl Outcome {
    pub fn value(value: impl Into<Value>) -> Self {
        Outcome::Ready(Ok(value.into()))
    }

    pub fn error(error: EffectError) -> Self {
        Outcome::Ready(Err(error))
    }

    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, EffectError>> + 'static,
    {
        Outcome::Future(future.boxed_local())
    }

    /// Short label of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Ready(Ok(_)) => "value",
            Outcome::Ready(Err(_)) => "error",
            Outcome::Future(_) => "future",
            Outcome::Coroutine(_) => "coroutine",
        }
    }

    /// Whether resuming with this outcome requires a suspension.
    pub fn suspends(&self) -> bool {
        matches!(self, Outcome::Future(_) | Outcome::Coroutine(_))
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Ready(Ok(value))
    }
}

impl From<Result<Value, EffectError>> for Outcome {
    fn from(result: Result<Value, EffectError>) -> Self {
        Outcome::Ready(result)
    }
}

impl From<Coroutine> for Outcome {
    fn from(coroutine: Coroutine) -> Self {
        Outcome::Coroutine(coroutine)
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Outcome::Future(_) => f.write_str("Future(..)"),
            Outcome::Coroutine(_) => f.write_str("Coroutine(..)"),
        }
    }
}

/// What a coroutine handed back when it suspended.
#[derive(Debug)]
pub enum Yielded {
    /// An effect to perform.
    Effect(Effect),
    /// Anything else is a proposed state, committed on the spot.
    Update(Value),
}

impl Yielded {
    pub fn is_effect(&self) -> bool {
        matches!(self, Yielded::Effect(_))
    }
}

/// Input a suspended coroutine is resumed with.
#[derive(Clone, Debug, PartialEq)]
pub enum Resume {
    /// No value: first step, or after a state update.
    Empty,
    /// The result of the last effect.
    Value(Value),
    /// The failure of the last effect, raised inside the coroutine.
    Error(EffectError),
}

impl Resume {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Resume::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&EffectError> {
        match self {
            Resume::Error(error) => Some(error),
            _ => None,
        }
    }
}

impl From<Result<Value, EffectError>> for Resume {
    fn from(result: Result<Value, EffectError>) -> Self {
        match result {
            Ok(value) => Resume::Value(value),
            Err(error) => Resume::Error(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_classifies_results() {
        assert_eq!(Outcome::from(json!(1)).kind(), "value");
        assert_eq!(Outcome::error(EffectError::new("boom")).kind(), "error");
        assert_eq!(Outcome::future(async { Ok(json!(1)) }).kind(), "future");
        let nested = Coroutine::new(|_co| async { Ok(Value::Null) });
        assert_eq!(Outcome::from(nested).kind(), "coroutine");
    }

    #[test]
    fn only_futures_and_coroutines_suspend() {
        assert!(!Outcome::value(1).suspends());
        assert!(!Outcome::error(EffectError::new("x")).suspends());
        assert!(Outcome::future(async { Ok(Value::Null) }).suspends());
    }

    #[test]
    fn call_records_name_and_args() {
        let effect = named_call("fetch", |_m, _a| json!(null), vec![json!("id")]);
        assert_eq!(effect.name(), "fetch");
        assert_eq!(effect.args(), &[json!("id")]);
        assert!(format!("{effect:?}").contains("fetch"));
    }

    #[test]
    fn resume_from_result() {
        assert_eq!(Resume::from(Ok::<_, EffectError>(json!(2))).value(), Some(&json!(2)));
        let error = EffectError::new("nope").with_detail(json!({"code": 4}));
        let resume = Resume::from(Err(error.clone()));
        assert_eq!(resume.error(), Some(&error));
        assert_eq!(error.detail(), Some(&json!({"code": 4})));
        assert_eq!(error.to_string(), "nope");
    }
}

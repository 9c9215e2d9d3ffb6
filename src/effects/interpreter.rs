//! Drives coroutine handlers to completion.
//!
//! One drive owns one coroutine. Each step resumes the coroutine and
//! interprets what it yields:
//!
//! - a `Call` effect is invoked with the machine as context; ready values
//!   and errors resume the coroutine immediately, futures suspend the drive
//!   until they settle, nested coroutines are driven by a child drive;
//! - anything else is a proposed state, committed before resuming.
//!
//! A drive suspended on a future makes progress when its [`DriveHandle`] is
//! awaited. The handle is a `!Send` future, so any single-threaded executor
//! can run it: await it in place, or spawn it on a `LocalSet`. Dropping every
//! handle of a suspended drive drops the drive.
//!
//! Cancellation is checked at the start of every step and drops the pending
//! future, so continuations queued before the cancel turn into no-ops.

use crate::effects::coroutine::{Coroutine, Progress};
use crate::effects::effect::{EffectError, Outcome, Resume, Yielded};
use crate::machine::{update, Machine, MachineError};
use crate::middleware::Event;
use futures::future::LocalBoxFuture;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use tracing::{trace, warn};

/// Callback invoked with the coroutine's final value.
pub type Completion = Box<dyn FnOnce(Value) -> Result<(), MachineError>>;

/// Callback invoked with the error that ended a drive.
type Failure = Box<dyn FnOnce(&MachineError)>;

type Pending = LocalBoxFuture<'static, Result<Value, EffectError>>;

struct Drive {
    machine: Machine,
    coroutine: RefCell<Option<Coroutine>>,
    pending: RefCell<Option<Pending>>,
    nested: RefCell<Option<DriveHandle>>,
    done: RefCell<Option<Completion>>,
    on_fail: RefCell<Option<Failure>>,
    waker: RefCell<Option<Waker>>,
    canceled: Cell<bool>,
    finished: Cell<bool>,
    failure: RefCell<Option<MachineError>>,
}

/// Handle of a drive.
///
/// Cloning the handle shares the same drive. Awaiting it runs the futures the
/// drive suspends on, and resolves to `Ok(())` once the drive finished or was
/// canceled, or to the error that ended it.
#[derive(Clone)]
pub struct DriveHandle {
    drive: Rc<Drive>,
}

impl DriveHandle {
    /// Stop the drive and every nested drive it is waiting on.
    ///
    /// Nested drives are canceled first. Pending futures are dropped, and no
    /// further state commits, notifications or completion callbacks happen
    /// for the drive.
    pub fn cancel(&self) {
        self.drive.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.drive.canceled.get()
    }

    /// Whether the coroutine returned (successfully or not).
    pub fn is_finished(&self) -> bool {
        self.drive.finished.get()
    }

    /// The error that ended the drive, if any.
    pub fn failure(&self) -> Option<MachineError> {
        self.drive.failure.borrow().clone()
    }
}

impl fmt::Debug for DriveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveHandle")
            .field("machine", &self.drive.machine.name())
            .field("finished", &self.is_finished())
            .field("canceled", &self.is_canceled())
            .field("failure", &self.failure())
            .field("nested", &self.drive.nested.borrow().is_some())
            .field("pending", &self.drive.pending.borrow().is_some())
            .finish()
    }
}

impl Future for DriveHandle {
    type Output = Result<(), MachineError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let root = &self.drive;
        loop {
            let failure = root.failure.borrow().clone();
            if let Some(error) = failure {
                return Poll::Ready(Err(error));
            }
            if root.finished.get() || root.canceled.get() {
                return Poll::Ready(Ok(()));
            }
            *root.waker.borrow_mut() = Some(cx.waker().clone());
            if root.leaf().poll_pending(cx).is_pending() {
                return Poll::Pending;
            }
        }
    }
}

/// Start driving `coroutine` on `machine`.
///
/// Runs until the coroutine first suspends on a future or nested drive, or
/// completes, then returns the drive's handle. `on_done` receives the final
/// value; it is not called if the drive is canceled or the coroutine fails.
///
/// No runtime is needed to start a drive. A drive that suspends on a future
/// continues when the returned handle is awaited.
pub fn drive<F>(
    machine: &Machine,
    coroutine: Coroutine,
    on_done: F,
) -> Result<DriveHandle, MachineError>
where
    F: FnOnce(Value) -> Result<(), MachineError> + 'static,
{
    let drive = start(machine, coroutine, Box::new(on_done), None)?;
    Ok(DriveHandle { drive })
}

fn start(
    machine: &Machine,
    coroutine: Coroutine,
    done: Completion,
    on_fail: Option<Failure>,
) -> Result<Rc<Drive>, MachineError> {
    let drive = Rc::new(Drive {
        machine: machine.clone(),
        coroutine: RefCell::new(Some(coroutine)),
        pending: RefCell::new(None),
        nested: RefCell::new(None),
        done: RefCell::new(Some(done)),
        on_fail: RefCell::new(on_fail),
        waker: RefCell::new(None),
        canceled: Cell::new(false),
        finished: Cell::new(false),
        failure: RefCell::new(None),
    });
    drive.step(Resume::Empty)?;
    Ok(drive)
}

impl Drive {
    fn step(self: &Rc<Self>, input: Resume) -> Result<(), MachineError> {
        self.advance(input).inspect_err(|error| self.fail(error))
    }

    fn advance(self: &Rc<Self>, mut input: Resume) -> Result<(), MachineError> {
        loop {
            if self.canceled.get() {
                trace!(machine = %self.machine.name(), "drive canceled, step skipped");
                return Ok(());
            }

            let Some(mut coroutine) = self.coroutine.borrow_mut().take() else {
                return Ok(());
            };

            let yielded = match coroutine.resume(input) {
                Progress::Complete(Ok(value)) => return self.complete(value),
                Progress::Complete(Err(error)) => return Err(MachineError::Handler(error)),
                Progress::Stalled => return Err(MachineError::CoroutineStalled),
                Progress::Yielded(yielded) => yielded,
            };
            *self.coroutine.borrow_mut() = Some(coroutine);

            self.machine.notify(&Event::Step(&yielded));

            input = match yielded {
                Yielded::Update(proposal) => {
                    trace!(machine = %self.machine.name(), "coroutine proposed a state");
                    update::commit(&self.machine, proposal)?;
                    self.resumed(Resume::Empty)
                }
                Yielded::Effect(effect) => {
                    trace!(machine = %self.machine.name(), effect = effect.name(), "invoking effect");
                    match effect.invoke(&self.machine) {
                        Outcome::Ready(result) => self.resumed(Resume::from(result)),
                        Outcome::Future(future) => {
                            trace!(machine = %self.machine.name(), "suspended on future");
                            *self.pending.borrow_mut() = Some(future);
                            return Ok(());
                        }
                        Outcome::Coroutine(nested) => return self.drive_nested(nested),
                    }
                }
            };
        }
    }

    fn resumed(&self, input: Resume) -> Resume {
        self.machine.notify(&Event::Resumed(&input));
        input
    }

    fn complete(&self, value: Value) -> Result<(), MachineError> {
        self.finish();
        self.machine.notify(&Event::End(&value));
        trace!(machine = %self.machine.name(), "coroutine finished");
        let done = self.done.borrow_mut().take();
        match done {
            Some(done) => done(value),
            None => Ok(()),
        }
    }

    fn finish(&self) {
        self.finished.set(true);
        self.nested.borrow_mut().take();
        self.pending.borrow_mut().take();
    }

    fn fail(&self, error: &MachineError) {
        self.finish();
        *self.failure.borrow_mut() = Some(error.clone());
        let on_fail = self.on_fail.borrow_mut().take();
        if let Some(on_fail) = on_fail {
            on_fail(error);
        }
    }

    fn cancel(&self) {
        let nested = self.nested.borrow_mut().take();
        if let Some(nested) = nested {
            nested.cancel();
        }
        self.canceled.set(true);
        self.pending.borrow_mut().take();
        let waker = self.waker.borrow_mut().take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// The innermost drive this one is waiting on.
    fn leaf(self: &Rc<Self>) -> Rc<Drive> {
        let mut drive = Rc::clone(self);
        loop {
            let next = drive
                .nested
                .borrow()
                .as_ref()
                .map(|nested| Rc::clone(&nested.drive));
            match next {
                Some(next) => drive = next,
                None => return drive,
            }
        }
    }

    /// Poll the future this drive is suspended on, stepping once it settles.
    fn poll_pending(self: &Rc<Self>, cx: &mut Context<'_>) -> Poll<()> {
        let pending = self.pending.borrow_mut().take();
        let Some(mut future) = pending else {
            self.fail(&MachineError::CoroutineStalled);
            return Poll::Ready(());
        };

        let settled = match future.as_mut().poll(cx) {
            Poll::Ready(settled) => settled,
            Poll::Pending if self.canceled.get() => return Poll::Ready(()),
            Poll::Pending => {
                *self.pending.borrow_mut() = Some(future);
                return Poll::Pending;
            }
        };
        if self.canceled.get() {
            return Poll::Ready(());
        }

        let input = self.resumed(Resume::from(settled));
        if let Err(error) = self.step(input) {
            warn!(machine = %self.machine.name(), %error, "drive failed after future settled");
        }
        Poll::Ready(())
    }

    fn drive_nested(self: &Rc<Self>, nested: Coroutine) -> Result<(), MachineError> {
        trace!(machine = %self.machine.name(), "starting nested coroutine");
        let resume = Rc::downgrade(self);
        let abort = Rc::downgrade(self);
        let child = start(
            &self.machine,
            nested,
            Box::new(move |value| {
                let Some(parent) = resume.upgrade() else {
                    return Ok(());
                };
                parent.nested.borrow_mut().take();
                if parent.canceled.get() {
                    return Ok(());
                }
                let input = parent.resumed(Resume::Value(value));
                parent.step(input)
            }),
            Some(Box::new(move |error: &MachineError| {
                let Some(parent) = abort.upgrade() else {
                    return;
                };
                parent.nested.borrow_mut().take();
                if !parent.canceled.get() {
                    parent.fail(error);
                }
            })),
        )?;
        if !child.finished.get() {
            *self.nested.borrow_mut() = Some(DriveHandle { drive: child });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MachineBuilder;
    use crate::effects::effect::call;
    use serde_json::json;

    fn machine() -> Machine {
        MachineBuilder::new()
            .state("idle")
            .transition("idle", "run", "running")
            .transition("running", "stop", "idle")
            .build()
            .unwrap()
    }

    #[test]
    fn sync_effects_resume_within_the_step() {
        let machine = machine();
        let result = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&result);

        let coroutine = Coroutine::new(|co| async move {
            let a = co.call(call(|_m, _a| json!(1), vec![])).await?;
            let b = co.call(call(|_m, args| args[0].clone(), vec![json!(2)])).await?;
            Ok(json!([a, b]))
        });
        let handle = drive(&machine, coroutine, move |value| {
            *sink.borrow_mut() = Some(value);
            Ok(())
        })
        .unwrap();

        assert!(handle.is_finished());
        assert_eq!(*result.borrow(), Some(json!([1, 2])));
    }

    #[test]
    fn updates_are_committed_immediately() {
        let machine = machine();
        let observed = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&observed);

        let coroutine = Coroutine::new(|co| async move {
            co.update("running").await;
            let name = co
                .call(call(|m: &Machine, _a| json!(m.state().name()), vec![]))
                .await?;
            co.update("idle").await;
            Ok(name)
        });
        drive(&machine, coroutine, move |value| {
            sink.borrow_mut().push(value);
            Ok(())
        })
        .unwrap();

        assert_eq!(*observed.borrow(), vec![json!("running")]);
        assert!(machine.is("idle"));
    }

    #[test]
    fn nested_coroutines_resume_the_parent() {
        let machine = machine();
        let result = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&result);

        let coroutine = Coroutine::new(|co| async move {
            let inner = co
                .call(call(
                    |_m, args| {
                        Coroutine::new(move |co| async move {
                            let x = co.call(call(|_m, a| a[0].clone(), args)).await?;
                            Ok(json!({ "inner": x }))
                        })
                    },
                    vec![json!("x")],
                ))
                .await?;
            Ok(inner)
        });
        let handle = drive(&machine, coroutine, move |value| {
            *sink.borrow_mut() = Some(value);
            Ok(())
        })
        .unwrap();

        assert!(handle.is_finished());
        assert_eq!(*result.borrow(), Some(json!({ "inner": "x" })));
    }

    #[test]
    fn uncaught_error_skips_completion() {
        let machine = machine();
        let called = Rc::new(Cell::new(false));
        let flag = Rc::clone(&called);

        let coroutine = Coroutine::new(|co| async move {
            co.call(call(|_m, _a| Outcome::error(EffectError::new("boom")), vec![]))
                .await?;
            Ok(Value::Null)
        });
        let result = drive(&machine, coroutine, move |_| {
            flag.set(true);
            Ok(())
        });

        assert!(matches!(result, Err(MachineError::Handler(e)) if e.message() == "boom"));
        assert!(!called.get());
    }

    #[test]
    fn uncovered_update_fails_the_drive() {
        let machine = machine();
        let coroutine = Coroutine::new(|co| async move {
            co.update("nowhere").await;
            Ok(Value::Null)
        });

        let result = drive(&machine, coroutine, |_| Ok(()));
        assert!(matches!(result, Err(MachineError::UncoveredState { .. })));
        assert!(machine.is("idle"));
    }

    #[test]
    fn foreign_awaits_stall_the_drive() {
        let machine = machine();
        let coroutine = Coroutine::new(|_co| async move {
            futures::future::pending::<()>().await;
            Ok(Value::Null)
        });

        let result = drive(&machine, coroutine, |_| Ok(()));
        assert_eq!(result.unwrap_err(), MachineError::CoroutineStalled);
    }

    #[test]
    fn caught_errors_resume_the_coroutine() {
        let resumes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&resumes);
        let machine = MachineBuilder::new()
            .state("idle")
            .declare("idle")
            .on_event(move |_machine, event| {
                if let Event::Resumed(resume) = event {
                    sink.borrow_mut().push((*resume).clone());
                }
            })
            .build()
            .unwrap();
        let result = Rc::new(RefCell::new(None));
        let out = Rc::clone(&result);

        let coroutine = Coroutine::new(|co| async move {
            let failing = call(|_m, _a| Outcome::error(EffectError::new("boom")), vec![]);
            match co.call(failing).await {
                Ok(_) => Ok(json!("unreachable")),
                Err(error) => Ok(json!({ "recovered": error.message() })),
            }
        });
        let handle = drive(&machine, coroutine, move |value| {
            *out.borrow_mut() = Some(value);
            Ok(())
        })
        .unwrap();

        assert!(handle.is_finished());
        assert!(handle.failure().is_none());
        assert_eq!(*result.borrow(), Some(json!({ "recovered": "boom" })));
        assert_eq!(*resumes.borrow(), vec![Resume::Error(EffectError::new("boom"))]);
    }

    #[test]
    fn futures_settle_without_a_runtime() {
        let machine = machine();
        let coroutine = Coroutine::new(|co| async move {
            let ready = call(|_m, _a| Outcome::future(async { Ok(json!("running")) }), vec![]);
            let next = co.call(ready).await?;
            co.update(next).await;
            Ok(Value::Null)
        });

        let handle = drive(&machine, coroutine, |_| Ok(())).unwrap();
        assert!(!handle.is_finished());
        assert!(machine.is("idle"));

        assert_eq!(futures::executor::block_on(handle.clone()), Ok(()));
        assert!(handle.is_finished());
        assert!(machine.is("running"));
    }

    #[test]
    fn cancel_propagates_to_nested() {
        let machine = machine();
        let coroutine = Coroutine::new(|co| async move {
            let nested = call(
                |_m, _a| {
                    Coroutine::new(|co| async move {
                        let never = call(
                            |_m, _a| Outcome::future(futures::future::pending()),
                            vec![],
                        );
                        co.call(never).await
                    })
                },
                vec![],
            );
            co.call(nested).await
        });

        let handle = drive(&machine, coroutine, |_| Ok(())).unwrap();
        let child = handle.drive.nested.borrow().clone().unwrap();
        assert!(child.drive.pending.borrow().is_some());

        handle.cancel();

        assert!(handle.is_canceled());
        assert!(child.is_canceled());
        assert!(child.drive.pending.borrow().is_none());
        assert!(handle.drive.nested.borrow().is_none());
        assert_eq!(futures::executor::block_on(handle), Ok(()));
    }

    #[test]
    fn nested_failures_end_the_parent() {
        let machine = machine();
        let coroutine = Coroutine::new(|co| async move {
            let nested = call(
                |_m, _a| {
                    Coroutine::new(|co| async move {
                        let offline = call(
                            |_m, _a| Outcome::future(async { Err(EffectError::new("offline")) }),
                            vec![],
                        );
                        co.call(offline).await?;
                        Ok(Value::Null)
                    })
                },
                vec![],
            );
            co.call(nested).await
        });

        let handle = drive(&machine, coroutine, |_| Ok(())).unwrap();
        let expected = MachineError::Handler(EffectError::new("offline"));

        assert_eq!(futures::executor::block_on(handle.clone()), Err(expected.clone()));
        assert!(handle.is_finished());
        assert_eq!(handle.failure(), Some(expected));
        assert!(handle.drive.nested.borrow().is_none());
    }
}

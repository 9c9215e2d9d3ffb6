//! Resumable computations written as `async` blocks.
//!
//! A coroutine body receives a [`Co`] handle. Awaiting `co.call(effect)` or
//! `co.update(state)` parks the body and hands the request to whoever is
//! driving it; the driver later resumes the body with a [`Resume`] input.
//! The body is polled directly with a no-op waker, so it only makes progress
//! when the driver resumes it.

use crate::effects::effect::{Effect, EffectError, Resume, Yielded};
use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;
use serde_json::Value;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Mailbox shared between a coroutine body and its driver.
#[derive(Default)]
struct Channel {
    yielded: Option<Yielded>,
    resumed: Option<Resume>,
}

/// Handle a coroutine body uses to suspend itself.
#[derive(Clone)]
pub struct Co {
    channel: Rc<RefCell<Channel>>,
}

impl Co {
    /// Ask the driver to perform `effect` and resume with its result.
    ///
    /// A failing effect comes back as `Err`, so the body can recover from it
    /// or propagate it with `?`.
    pub async fn call(&self, effect: Effect) -> Result<Value, EffectError> {
        match self.suspend(Yielded::Effect(effect)).await {
            Resume::Value(value) => Ok(value),
            Resume::Error(error) => Err(error),
            // A driver resumes calls with their result; an empty resume is a
            // driver bug, surfaced to the body as a failed call.
            Resume::Empty => Err(EffectError::new("effect resumed without a result")),
        }
    }

    /// Propose a new machine state. The driver commits it before resuming.
    pub async fn update(&self, next: impl Into<Value>) {
        self.suspend(Yielded::Update(next.into())).await;
    }

    fn suspend(&self, yielded: Yielded) -> Suspend {
        Suspend {
            channel: Rc::clone(&self.channel),
            pending: Some(yielded),
        }
    }
}

/// Future that parks a body until the driver resumes it.
struct Suspend {
    channel: Rc<RefCell<Channel>>,
    pending: Option<Yielded>,
}

impl Future for Suspend {
    type Output = Resume;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Resume> {
        if let Some(yielded) = self.pending.take() {
            let mut channel = self.channel.borrow_mut();
            channel.yielded = Some(yielded);
            channel.resumed = None;
            return Poll::Pending;
        }
        match self.channel.borrow_mut().resumed.take() {
            Some(resume) => Poll::Ready(resume),
            None => Poll::Pending,
        }
    }
}

/// What happened when a coroutine was resumed.
#[derive(Debug)]
pub enum Progress {
    /// The body suspended with a request.
    Yielded(Yielded),
    /// The body returned.
    Complete(Result<Value, EffectError>),
    /// The body is pending on something other than its `Co` handle.
    Stalled,
}

/// A suspendable computation producing a final value.
///
/// ```rust
/// use machina::effects::{Coroutine, Progress, Resume, Yielded};
/// use serde_json::json;
///
/// let mut coroutine = Coroutine::new(|co| async move {
///     co.update("loading").await;
///     Ok(json!("done"))
/// });
///
/// assert!(matches!(
///     coroutine.resume(Resume::Empty),
///     Progress::Yielded(Yielded::Update(_))
/// ));
/// assert!(matches!(
///     coroutine.resume(Resume::Empty),
///     Progress::Complete(Ok(value)) if value == json!("done")
/// ));
/// ```
pub struct Coroutine {
    channel: Rc<RefCell<Channel>>,
    body: LocalBoxFuture<'static, Result<Value, EffectError>>,
    finished: bool,
}

impl Coroutine {
    /// Create a coroutine from a body taking the yield handle.
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Co) -> Fut,
        Fut: Future<Output = Result<Value, EffectError>> + 'static,
    {
        let channel = Rc::new(RefCell::new(Channel::default()));
        let co = Co {
            channel: Rc::clone(&channel),
        };
        Self {
            channel,
            body: body(co).boxed_local(),
            finished: false,
        }
    }

    /// Run the body until it next suspends or returns.
    ///
    /// The input is delivered to the request the body is parked on; on the
    /// first resume there is none and the input is discarded. Resuming a
    /// finished coroutine reports `Stalled`.
    pub fn resume(&mut self, input: Resume) -> Progress {
        if self.finished {
            return Progress::Stalled;
        }
        self.channel.borrow_mut().resumed = Some(input);

        let mut cx = Context::from_waker(noop_waker_ref());
        match self.body.as_mut().poll(&mut cx) {
            Poll::Ready(output) => {
                self.finished = true;
                Progress::Complete(output)
            }
            Poll::Pending => match self.channel.borrow_mut().yielded.take() {
                Some(yielded) => Progress::Yielded(yielded),
                None => Progress::Stalled,
            },
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

//! Lifecycle notifications for observers of a machine.
//!
//! Middleware is registered on the builder and notified synchronously, in
//! registration order. Observers must not change the machine from inside a
//! notification.
//!
//! For one coroutine drive the interpreter emits
//! `Step, Resumed, Step, Resumed, ..., End`; nothing is emitted after the
//! drive is canceled.

use crate::core::State;
use crate::effects::{Resume, Yielded};
use crate::machine::Machine;
use serde_json::Value;
use std::rc::Rc;

/// A lifecycle event, borrowed for the duration of the notification.
#[derive(Debug)]
pub enum Event<'a> {
    /// The machine was built.
    MachineCreated,
    /// An action matched a handler and is about to run.
    ActionDispatched { action: &'a str, args: &'a [Value] },
    /// An action's final state was committed.
    ActionProcessed { action: &'a str, args: &'a [Value] },
    /// A validated state is about to replace the current one.
    StateWillChange { current: &'a State, next: &'a State },
    /// A state was committed.
    StateChanged { previous: &'a State, current: &'a State },
    /// A coroutine yielded.
    Step(&'a Yielded),
    /// A coroutine is about to be resumed with this input.
    Resumed(&'a Resume),
    /// A coroutine returned this value.
    End(&'a Value),
}

/// Discriminant of an [`Event`], convenient for recording and filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    MachineCreated,
    ActionDispatched,
    ActionProcessed,
    StateWillChange,
    StateChanged,
    Step,
    Resumed,
    End,
}

impl Event<'_> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::MachineCreated => EventKind::MachineCreated,
            Event::ActionDispatched { .. } => EventKind::ActionDispatched,
            Event::ActionProcessed { .. } => EventKind::ActionProcessed,
            Event::StateWillChange { .. } => EventKind::StateWillChange,
            Event::StateChanged { .. } => EventKind::StateChanged,
            Event::Step(_) => EventKind::Step,
            Event::Resumed(_) => EventKind::Resumed,
            Event::End(_) => EventKind::End,
        }
    }

    /// Whether the event belongs to a coroutine drive.
    pub fn is_drive_event(&self) -> bool {
        matches!(self, Event::Step(_) | Event::Resumed(_) | Event::End(_))
    }
}

/// Observer of machine lifecycle events.
pub trait Middleware {
    fn on_event(&self, machine: &Machine, event: &Event<'_>);
}

struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&Machine, &Event<'_>),
{
    fn on_event(&self, machine: &Machine, event: &Event<'_>) {
        (self.0)(machine, event)
    }
}

/// Ordered list of subscribers.
#[derive(Clone, Default)]
pub struct MiddlewareNotifier {
    subscribers: Vec<Rc<dyn Middleware>>,
}

impl MiddlewareNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, middleware: Rc<dyn Middleware>) {
        self.subscribers.push(middleware);
    }

    pub fn subscribe_fn<F>(&mut self, observer: F)
    where
        F: Fn(&Machine, &Event<'_>) + 'static,
    {
        self.subscribers.push(Rc::new(FnMiddleware(observer)));
    }

    /// Deliver `event` to every subscriber, in registration order.
    pub fn notify(&self, machine: &Machine, event: &Event<'_>) {
        for subscriber in &self.subscribers {
            subscriber.on_event(machine, event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

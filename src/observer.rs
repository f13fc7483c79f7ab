//! Observation hooks.
//!
//! The engine reports every scheduled and every dispatched event to an
//! optional [`SimulationObserver`]. Observers see events but cannot alter
//! them, so attaching one never changes a run.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::event::Event;
use crate::message::{Message, MessageType};
use crate::object::ObjectId;
use crate::time::SimTime;

/// Callbacks invoked by the engine. Both default to no-ops.
pub trait SimulationObserver<M: Message> {
    /// An event was accepted into the queue.
    fn on_schedule(&mut self, event: &Event<M>) {
        let _ = event;
    }

    /// An event is about to be handled by its receiver.
    fn on_dispatch(&mut self, event: &Event<M>) {
        let _ = event;
    }
}

/// Shared observers, so a caller can keep reading what the engine recorded.
impl<M: Message, O: SimulationObserver<M>> SimulationObserver<M> for Rc<RefCell<O>> {
    fn on_schedule(&mut self, event: &Event<M>) {
        self.borrow_mut().on_schedule(event);
    }

    fn on_dispatch(&mut self, event: &Event<M>) {
        self.borrow_mut().on_dispatch(event);
    }
}

// ── TracingObserver ───────────────────────────────────────────────────

/// Forwards every dispatch (and, optionally, every schedule) to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    pub schedules: bool,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log each scheduled event.
    pub fn with_schedules(mut self) -> Self {
        self.schedules = true;
        self
    }
}

impl<M: Message> SimulationObserver<M> for TracingObserver {
    fn on_schedule(&mut self, event: &Event<M>) {
        if self.schedules {
            info!(
                send_time = %event.send_time(),
                receive_time = %event.receive_time(),
                sender = %event.sender().id(),
                receiver = %event.receiver().id(),
                message_type = %event.message_type(),
                "scheduled"
            );
        }
    }

    fn on_dispatch(&mut self, event: &Event<M>) {
        info!(
            time = %event.receive_time(),
            sender = %event.sender().id(),
            receiver = %event.receiver().id(),
            message_type = %event.message_type(),
            "dispatched"
        );
    }
}

// ── TraceRecorder ─────────────────────────────────────────────────────

/// One dispatched event, as recorded by [`TraceRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub time: SimTime,
    pub sender: ObjectId,
    pub receiver: ObjectId,
    pub message_type: MessageType,
    /// `Debug` rendering of the message.
    pub message: String,
}

impl TraceEntry {
    pub fn from_event<M: Message>(event: &Event<M>) -> Self {
        TraceEntry {
            time: event.receive_time(),
            sender: event.sender().id().clone(),
            receiver: event.receiver().id().clone(),
            message_type: event.message_type(),
            message: format!("{:?}", event.message()),
        }
    }
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[t={}] {} -> {} {}",
            self.time, self.sender, self.receiver, self.message
        )
    }
}

/// Records the dispatch order of a run.
///
/// Two runs are equivalent when their recorders hold equal entries, which
/// is how determinism is checked.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    entries: Vec<TraceEntry>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder wrapped for sharing with an engine.
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<M: Message> SimulationObserver<M> for TraceRecorder {
    fn on_dispatch(&mut self, event: &Event<M>) {
        self.entries.push(TraceEntry::from_event(event));
    }
}

//! `SimContext`, the only way a simulation object interacts with the rest
//! of the simulation.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::event::Event;
use crate::message::Message;
use crate::observer::SimulationObserver;
use crate::queue::EventQueue;
use crate::time::SimTime;

use super::id::{ObjectHandle, ObjectId};

/// Name → handle lookup of every registered object.
pub(crate) type Directory = BTreeMap<ObjectId, ObjectHandle>;

/// Mutable context passed to an object while it runs (initial events or a
/// dispatched batch).
///
/// The context borrows the engine's queue mutably and its registry
/// read-only, so an object can schedule events but can neither reach
/// another object's state nor reorder pending events.
pub struct SimContext<'a, M> {
    queue: &'a mut EventQueue<M>,
    directory: &'a Directory,
    observer: Option<&'a mut (dyn SimulationObserver<M> + 'static)>,
    sender: ObjectHandle,
    now: SimTime,
}

impl<'a, M: Message> SimContext<'a, M> {
    pub(crate) fn new(
        queue: &'a mut EventQueue<M>,
        directory: &'a Directory,
        observer: Option<&'a mut (dyn SimulationObserver<M> + 'static)>,
        sender: ObjectHandle,
        now: SimTime,
    ) -> Self {
        SimContext {
            queue,
            directory,
            observer,
            sender,
            now,
        }
    }

    /// Name of the object this context belongs to.
    #[inline]
    pub fn id(&self) -> &ObjectId {
        self.sender.id()
    }

    /// The object's current simulated time.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Send a copy of `message` to `receiver`, `delay` after now.
    ///
    /// Fails with `InvalidTime` if `delay` is negative or NaN and with
    /// `InvalidMessage` if the sender may not send or the receiver does
    /// not handle the message's type. Nothing is enqueued on failure.
    pub fn send_event(&mut self, delay: f64, receiver: &ObjectId, message: &M) -> SimResult<()> {
        self.send_event_owned(delay, receiver, message.clone())
    }

    /// Like [`send_event`](Self::send_event), but moves `message` into the
    /// event instead of copying it.
    pub fn send_event_owned(&mut self, delay: f64, receiver: &ObjectId, message: M) -> SimResult<()> {
        let at = self.now.plus(delay)?;
        self.schedule(at.value(), receiver, message)
    }

    /// Send a copy of `message` to `receiver` at absolute time `time`.
    ///
    /// `time` may not be NaN or earlier than now.
    pub fn send_event_absolute(&mut self, time: f64, receiver: &ObjectId, message: &M) -> SimResult<()> {
        self.send_event_absolute_owned(time, receiver, message.clone())
    }

    /// Like [`send_event_absolute`](Self::send_event_absolute), but moves
    /// `message` into the event.
    pub fn send_event_absolute_owned(&mut self, time: f64, receiver: &ObjectId, message: M) -> SimResult<()> {
        if time.is_nan() {
            return Err(SimError::InvalidTime("event time is NaN".into()));
        }
        if time < self.now.value() {
            return Err(SimError::InvalidTime(format!(
                "event time ({}) < current time ({}) of '{}'",
                time,
                self.now,
                self.sender.id()
            )));
        }
        self.schedule(time, receiver, message)
    }

    /// Number of pending events in the engine's queue.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Human-readable table of the pending events, if any.
    pub fn render_queue(&self) -> Option<String> {
        self.queue.render(None)
    }

    fn schedule(&mut self, time: f64, receiver: &ObjectId, message: M) -> SimResult<()> {
        let receiver = self
            .directory
            .get(receiver)
            .ok_or_else(|| SimError::UnknownObject(receiver.clone()))?
            .clone();
        let event = Event::try_new(self.now.value(), time, self.sender.clone(), receiver, message)?;

        debug!(
            sender = %event.sender().id(),
            receiver = %event.receiver().id(),
            send_time = %event.send_time(),
            receive_time = %event.receive_time(),
            message_type = %event.message_type(),
            "send"
        );
        if let Some(observer) = self.observer.as_deref_mut() {
            observer.on_schedule(&event);
        }
        self.queue.insert(event);
        Ok(())
    }
}

//! Deterministic event queue.
//!
//! A `BinaryHeap` of `Reverse<Event>` acts as a min-heap keyed by the
//! event order `(receive_time, class priority, receiver name, ...)`. All
//! events for one receiver at one time are therefore adjacent in pop order
//! and come out together as a batch. The heap order knows nothing of
//! message-type priorities, so a batch with more than one event is sorted
//! again by the receiver's handler priorities and then by message.
//!
//! Scheduling costs `O(log n)`; popping a batch of `m` events costs
//! `O(m log n)` plus `O(m log m)` when `m > 1`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::collections::BTreeSet;

use crate::error::SimResult;
use crate::event::Event;
use crate::message::Message;
use crate::object::{ObjectHandle, ObjectId};
use crate::time::SimTime;

/// The pending events of a simulation.
#[derive(Debug, Clone)]
pub struct EventQueue<M> {
    heap: BinaryHeap<Reverse<Event<M>>>,
}

impl<M: Message> EventQueue<M> {
    pub fn new() -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
        }
    }

    /// Drop every pending event.
    pub fn reset(&mut self) {
        self.heap.clear();
    }

    /// Validate and insert a new event.
    ///
    /// Fails with `InvalidTime` or `InvalidMessage` as described on
    /// [`Event::try_new`]; the queue is unchanged on failure.
    pub fn schedule(
        &mut self,
        send_time: f64,
        receive_time: f64,
        sender: &ObjectHandle,
        receiver: &ObjectHandle,
        message: M,
    ) -> SimResult<()> {
        let event = Event::try_new(send_time, receive_time, sender.clone(), receiver.clone(), message)?;
        self.insert(event);
        Ok(())
    }

    /// Insert an already validated event.
    pub fn insert(&mut self, event: Event<M>) {
        self.heap.push(Reverse(event));
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Time of the next event, or [`SimTime::INFINITY`] if the queue is empty.
    pub fn peek_time(&self) -> SimTime {
        self.heap
            .peek()
            .map(|Reverse(event)| event.receive_time())
            .unwrap_or(SimTime::INFINITY)
    }

    /// Receiver of the next event.
    pub fn next_receiver(&self) -> Option<&ObjectId> {
        self.heap.peek().map(|Reverse(event)| event.receiver().id())
    }

    /// Remove and return every event sharing the minimum
    /// `(receive_time, receiver)`, in delivery order.
    ///
    /// Returns an empty vector if the queue is empty.
    pub fn pop_next_batch(&mut self) -> Vec<Event<M>> {
        let Some(Reverse(first)) = self.heap.pop() else {
            return Vec::new();
        };
        let time = first.receive_time();
        let receiver = first.receiver().clone();
        let mut batch = vec![first];

        while let Some(Reverse(next)) = self.heap.peek() {
            if next.receive_time() != time || next.receiver().id() != receiver.id() {
                break;
            }
            if let Some(Reverse(event)) = self.heap.pop() {
                batch.push(event);
            }
        }

        if batch.len() > 1 {
            let info = receiver.info();
            batch.sort_by(|a, b| {
                info.priority_of(a.message_type())
                    .cmp(&info.priority_of(b.message_type()))
                    .then_with(|| a.message().cmp(b.message()))
            });
        }
        batch
    }

    /// Drop every pending event addressed to `receiver`.
    pub(crate) fn remove_receiver(&mut self, receiver: &ObjectId) {
        self.heap.retain(|Reverse(event)| event.receiver().id() != receiver);
    }

    /// Pending events in pop order, without consuming the queue.
    pub fn sorted_events(&self) -> Vec<&Event<M>> {
        let mut events: Vec<&Event<M>> = self.heap.iter().map(|Reverse(event)| event).collect();
        events.sort();
        events
    }

    /// Render the pending events as a tab-separated table, one row per
    /// event in pop order; `None` if there is nothing to show.
    ///
    /// If every event carries the same message type the header names the
    /// message fields; otherwise each row labels its fields.
    pub fn render(&self, receiver: Option<&ObjectId>) -> Option<String> {
        let events: Vec<&Event<M>> = self
            .sorted_events()
            .into_iter()
            .filter(|event| receiver.map_or(true, |id| event.receiver().id() == id))
            .collect();
        let first = events.first()?;

        let message_types: BTreeSet<_> = events.iter().map(|event| event.message_type()).collect();
        let mut rows = Vec::with_capacity(events.len() + 1);
        if message_types.len() > 1 {
            rows.push(Event::<M>::header());
            rows.extend(events.iter().map(|event| event.render(true)));
        } else {
            rows.push(first.custom_header());
            rows.extend(events.iter().map(|event| event.render(false)));
        }

        Some(
            rows.iter()
                .map(|row| row.join("\t"))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}

impl<M: Message> Default for EventQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> std::fmt::Display for EventQueue<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(None).unwrap_or_default())
    }
}

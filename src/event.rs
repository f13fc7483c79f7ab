//! Events: immutable, validated records of one message delivery.
//!
//! Events define the total order used by the event queue:
//! `(receive_time, receiver class priority, receiver name)`, refined by the
//! message and then the sender so that the order is strict for distinct
//! events.

use std::cmp::Ordering;

use crate::error::{SimError, SimResult};
use crate::message::{Message, MessageType};
use crate::object::{ClassPriority, ObjectHandle, ObjectId};
use crate::time::SimTime;

// ── OrderKey ──────────────────────────────────────────────────────────

/// The scheduling key of an event. Smaller keys are dispatched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderKey<'a> {
    pub receive_time: SimTime,
    pub class_priority: ClassPriority,
    pub tiebreak: &'a ObjectId,
}

// ── Event ─────────────────────────────────────────────────────────────

/// A scheduled delivery of one message from a sender to a receiver.
///
/// Fields are private: an event can only be built through
/// [`Event::try_new`], which enforces its invariants, and is never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct Event<M> {
    send_time: SimTime,
    receive_time: SimTime,
    sender: ObjectHandle,
    receiver: ObjectHandle,
    message: M,
}

impl<M: Message> Event<M> {
    /// Column headers shared by every rendered event.
    pub const BASE_HEADERS: [&'static str; 5] =
        ["t(send)", "t(event)", "Sender", "Receiver", "Event type"];

    /// Build an event.
    ///
    /// Fails with `InvalidTime` if either time is NaN or
    /// `receive_time < send_time`, and with `InvalidMessage` if the sender
    /// is not registered to send, or the receiver to receive, the
    /// message's type.
    pub fn try_new(
        send_time: f64,
        receive_time: f64,
        sender: ObjectHandle,
        receiver: ObjectHandle,
        message: M,
    ) -> SimResult<Self> {
        if send_time.is_nan() || receive_time.is_nan() {
            return Err(SimError::InvalidTime(format!(
                "send_time ({}) and/or receive_time ({}) is NaN",
                send_time, receive_time
            )));
        }
        if receive_time < send_time {
            return Err(SimError::InvalidTime(format!(
                "receive_time < send_time: {} < {}",
                receive_time, send_time
            )));
        }

        let message_type = message.message_type();
        if !sender.info().sends(message_type) {
            return Err(SimError::InvalidMessage(format!(
                "'{}' simulation objects not registered to send '{}' messages",
                sender.type_name(),
                message_type
            )));
        }
        if !receiver.info().handles(message_type) {
            return Err(SimError::InvalidMessage(format!(
                "'{}' simulation objects not registered to receive '{}' messages",
                receiver.type_name(),
                message_type
            )));
        }

        Ok(Event {
            send_time: SimTime::new(send_time)?,
            receive_time: SimTime::new(receive_time)?,
            sender,
            receiver,
            message,
        })
    }

    #[inline]
    pub fn send_time(&self) -> SimTime {
        self.send_time
    }

    #[inline]
    pub fn receive_time(&self) -> SimTime {
        self.receive_time
    }

    #[inline]
    pub fn sender(&self) -> &ObjectHandle {
        &self.sender
    }

    #[inline]
    pub fn receiver(&self) -> &ObjectHandle {
        &self.receiver
    }

    #[inline]
    pub fn message(&self) -> &M {
        &self.message
    }

    #[inline]
    pub fn message_type(&self) -> MessageType {
        self.message.message_type()
    }

    pub fn order_key(&self) -> OrderKey<'_> {
        OrderKey {
            receive_time: self.receive_time,
            class_priority: self.receiver.class_priority(),
            tiebreak: self.receiver.id(),
        }
    }

    // ── Rendering ─────────────────────────────────────────────────

    /// Headers for a table of events carrying different message types.
    pub fn header() -> Vec<String> {
        let mut header: Vec<String> = Self::BASE_HEADERS.iter().map(|h| h.to_string()).collect();
        header.push("Message fields...".to_string());
        header
    }

    /// Headers naming this event's message fields.
    pub fn custom_header(&self) -> Vec<String> {
        let mut header: Vec<String> = Self::BASE_HEADERS.iter().map(|h| h.to_string()).collect();
        header.extend(self.message.fields().into_iter().map(|(name, _)| name.to_string()));
        header
    }

    /// One table row. `annotated` prefixes each message field with its name.
    pub fn render(&self, annotated: bool) -> Vec<String> {
        let mut row = vec![
            self.send_time.to_string(),
            self.receive_time.to_string(),
            self.sender.to_string(),
            self.receiver.to_string(),
            self.message_type().to_string(),
        ];
        row.extend(self.message.fields().into_iter().map(|(name, value)| {
            if annotated {
                format!("{}:{}", name, value)
            } else {
                value
            }
        }));
        row
    }
}

impl<M: Message> Ord for Event<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key()
            .cmp(&other.order_key())
            .then_with(|| self.message.cmp(&other.message))
            .then_with(|| self.send_time.cmp(&other.send_time))
            .then_with(|| self.sender.id().cmp(other.sender.id()))
    }
}

impl<M: Message> PartialOrd for Event<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M: Message> PartialEq for Event<M> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<M: Message> Eq for Event<M> {}

impl<M: Message> std::fmt::Display for Event<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(true).join("\t"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::testing::{TestMsg, INIT, VALUE};
    use crate::object::{ClassPriority, Registration};

    struct Probe;

    fn registration(name: &'static str, priority: ClassPriority) -> Registration<Probe, TestMsg> {
        fn noop(
            _: &mut Probe,
            _: &mut crate::object::SimContext<'_, TestMsg>,
            _: &Event<TestMsg>,
        ) -> SimResult<()> {
            Ok(())
        }
        Registration::builder(name)
            .class_priority(priority)
            .handler(INIT, noop)
            .handler(VALUE, noop)
            .sends(INIT)
            .sends(VALUE)
            .build()
            .unwrap()
    }

    fn event(time: f64, receiver: &ObjectHandle, message: TestMsg) -> Event<TestMsg> {
        let sender = registration("Sender", ClassPriority::DEFAULT).handle("sender");
        Event::try_new(0.0, time, sender, receiver.clone(), message).unwrap()
    }

    fn assert_strictly_less(lesser: &Event<TestMsg>, greater: &Event<TestMsg>) {
        assert!(lesser < greater);
        assert!(!(lesser > greater));
        assert!(lesser <= lesser);
        assert!(greater > lesser);
        assert!(greater >= lesser);
    }

    #[test]
    fn test_order_by_time() {
        let a = registration("Example", ClassPriority::HIGH).handle("a");
        let b = registration("Example", ClassPriority::HIGH).handle("b");
        assert_strictly_less(&event(1.0, &a, TestMsg::Init), &event(2.0, &b, TestMsg::Init));
    }

    #[test]
    fn test_order_by_name_within_class() {
        let reg = registration("Example", ClassPriority::HIGH);
        let a = reg.handle("a");
        let b = reg.handle("b");
        assert_strictly_less(&event(1.0, &a, TestMsg::Init), &event(1.0, &b, TestMsg::Init));
    }

    #[test]
    fn test_class_priority_before_name() {
        let high = registration("Example", ClassPriority::HIGH).handle("a");
        // Sorts before "a" by name, but its class runs later.
        let low = registration("LowPriority", ClassPriority::LOW).handle("Z");
        assert_strictly_less(&event(1.0, &high, TestMsg::Init), &event(1.0, &low, TestMsg::Init));
    }

    #[test]
    fn test_equal_events_compare_equal() {
        let b = registration("Example", ClassPriority::HIGH).handle("b");
        let e1 = event(1.0, &b, TestMsg::value(1, "bye"));
        let e2 = event(1.0, &b, TestMsg::value(1, "bye"));
        assert!(e1 <= e2);
        assert!(e1 >= e2);
        assert_eq!(e1, e2);
    }

    #[test]
    fn test_message_breaks_remaining_ties() {
        let b = registration("Example", ClassPriority::HIGH).handle("b");
        let e1 = event(1.0, &b, TestMsg::value(1, "bye"));
        let e2 = event(1.0, &b, TestMsg::value(2, "bye"));
        assert_eq!(e1.order_key(), e2.order_key());
        assert_strictly_less(&e1, &e2);
    }

    #[test]
    fn test_invalid_times_rejected() {
        let reg = registration("Example", ClassPriority::HIGH);
        let (s, r) = (reg.handle("s"), reg.handle("r"));
        let nan = Event::try_new(f64::NAN, 1.0, s.clone(), r.clone(), TestMsg::Init);
        assert!(matches!(nan, Err(SimError::InvalidTime(_))));
        let past = Event::try_new(5.0, 1.0, s, r, TestMsg::Init);
        assert!(matches!(past, Err(SimError::InvalidTime(_))));
    }

    #[test]
    fn test_unregistered_message_rejected() {
        let reg = registration("Example", ClassPriority::HIGH);
        let e = Event::try_new(0.0, 1.0, reg.handle("s"), reg.handle("r"), TestMsg::Ping(3));
        assert!(matches!(e, Err(SimError::InvalidMessage(_))));
    }

    #[test]
    fn test_render_and_headers() {
        let reg = registration("Example", ClassPriority::HIGH);
        let e = Event::try_new(0.0, 1.5, reg.handle("s"), reg.handle("r"), TestMsg::value(4, "hi")).unwrap();

        let custom = e.custom_header();
        assert_eq!(&custom[..5], &Event::<TestMsg>::BASE_HEADERS);
        assert_eq!(&custom[5..], &["x".to_string(), "label".to_string()]);
        assert_eq!(Event::<TestMsg>::header().len(), 6);

        assert_eq!(
            e.render(false),
            vec!["0", "1.5", "Example:s", "Example:r", "Value", "4", "hi"]
        );
        assert_eq!(&e.render(true)[5..], &["x:4".to_string(), "label:hi".to_string()]);
        assert!(e.to_string().contains("Value"));
        assert!(e.to_string().contains("x:4\tlabel:hi"));
    }
}

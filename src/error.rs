//! Structured error types for the simulation kernel.
//!
//! All fallible public APIs return `Result<T, SimError>`. Type-declaration
//! errors (`DuplicateHandler`, `IncompleteRegistration`) and registration
//! errors indicate a programming error in application code; the rest are
//! runtime conditions surfaced to the caller between `run` calls. Nothing is
//! retried and no value is silently coerced.

use thiserror::Error;

use crate::message::MessageType;
use crate::object::ObjectId;
use crate::time::SimTime;

/// The top-level error type for the simulation kernel.
#[derive(Debug, Error)]
pub enum SimError {
    // ── Scheduling errors ─────────────────────────────────

    /// A time or delay is NaN, negative, or violates causality.
    #[error("invalid time: {0}")]
    InvalidTime(String),

    /// A message type is not registered to be sent by the sender or
    /// received by the receiver.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    // ── Type declaration errors ───────────────────────────

    /// The same message type was declared twice in one handler list.
    #[error("message type '{message_type}' appears repeatedly in the handlers of '{type_name}'")]
    DuplicateHandler {
        type_name: &'static str,
        message_type: MessageType,
    },

    /// A simulation object type declares (and inherits) neither handlers
    /// nor sent message types.
    #[error("simulation object type '{0}' must declare or inherit handlers or sent message types")]
    IncompleteRegistration(&'static str),

    // ── Registry errors ───────────────────────────────────

    /// An object with this name is already registered with the engine.
    #[error("an object named '{0}' is already registered")]
    DuplicateName(ObjectId),

    /// The object is already attached to a simulation engine.
    #[error("object '{0}' is already part of a simulation engine")]
    AlreadyRegistered(ObjectId),

    /// A name was referenced but is not in the engine's registry.
    #[error("object '{0}' is not registered")]
    UnknownObject(ObjectId),

    // ── Dispatch errors ───────────────────────────────────

    /// A dispatched message has no handler on its receiver.
    #[error("no handler registered on '{object}' for message type '{message_type}'")]
    NoHandlerRegistered {
        object: ObjectId,
        message_type: MessageType,
    },

    /// A receiver's local clock would move backwards.
    #[error("clock of '{object}' would go backward: current {current}, event {requested}")]
    ClockRegression {
        object: ObjectId,
        current: SimTime,
        requested: SimTime,
    },

    /// An engine operation was called in the wrong lifecycle state.
    #[error("invalid engine state: {0}")]
    InvalidState(String),

    // ── Checkpoint errors ─────────────────────────────────

    /// A periodic object was constructed with a non-positive period.
    #[error("period must be positive, but is {0}")]
    InvalidPeriod(f64),

    /// No checkpoint was recorded at or before the requested time.
    #[error("no checkpoint at or before time {0}")]
    NoCheckpoint(SimTime),

    // ── Storage / configuration errors ────────────────────

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_duplicate_name() {
        let e = SimError::DuplicateName(ObjectId::from("walker"));
        assert_eq!(e.to_string(), "an object named 'walker' is already registered");
    }

    #[test]
    fn test_error_display_duplicate_handler() {
        let e = SimError::DuplicateHandler {
            type_name: "Walker",
            message_type: MessageType::new("Step"),
        };
        let s = e.to_string();
        assert!(s.contains("Step"));
        assert!(s.contains("Walker"));
    }

    #[test]
    fn test_error_display_clock_regression() {
        let e = SimError::ClockRegression {
            object: ObjectId::from("a"),
            current: SimTime::from_raw(10.0),
            requested: SimTime::from_raw(3.0),
        };
        let s = e.to_string();
        assert!(s.contains("10"));
        assert!(s.contains('3'));
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> SimResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(SimError::Io(_))));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(SimError::InvalidPeriod(0.0));
        assert!(!e.to_string().is_empty());
    }
}

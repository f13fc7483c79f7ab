//! Messages carried by events.
//!
//! An application models its messages as one closed enum implementing
//! [`Message`]. Each variant maps to a [`MessageType`] tag, which is the key
//! simulation object types use to declare handlers and sent types. `Ord`
//! is the structural tie-break for concurrent messages: deriving it compares
//! the variant first and then its fields in declaration order.

use std::fmt;

/// Stable dispatch tag for one kind of message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageType(&'static str);

impl MessageType {
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        MessageType(name)
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A value exchanged between simulation objects.
///
/// `Clone` backs copy-on-send; `Ord` must be a structural comparison so
/// the delivery order of concurrent messages is reproducible.
///
/// # Example
///
/// ```rust
/// use desim::{Message, MessageType};
///
/// #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
/// enum Walk {
///     Step { dx: i64 },
///     Reset,
/// }
///
/// impl Message for Walk {
///     fn message_type(&self) -> MessageType {
///         match self {
///             Walk::Step { .. } => MessageType::new("Step"),
///             Walk::Reset => MessageType::new("Reset"),
///         }
///     }
///
///     fn fields(&self) -> Vec<(&'static str, String)> {
///         match self {
///             Walk::Step { dx } => vec![("dx", dx.to_string())],
///             Walk::Reset => Vec::new(),
///         }
///     }
/// }
/// ```
pub trait Message: Clone + Ord + fmt::Debug + 'static {
    /// The dispatch tag of this value's variant.
    fn message_type(&self) -> MessageType;

    /// Named fields in declaration order, for rendering.
    fn fields(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

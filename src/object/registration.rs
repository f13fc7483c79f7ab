//! Class-level declarations of simulation object types.
//!
//! Every simulation object type declares, once, which message types it
//! handles (in priority order) and which it may send. [`RegistrationBuilder`]
//! collects these declarations, merges any inherited ones, and validates
//! them when [`RegistrationBuilder::build`] is called.
//!
//! ```rust
//! use desim::object::{ObjectCore, Registration, SimContext, SimulationObject};
//! use desim::{Event, Message, MessageType, SimResult};
//!
//! #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
//! struct Tick;
//!
//! impl Message for Tick {
//!     fn message_type(&self) -> MessageType {
//!         MessageType::new("Tick")
//!     }
//! }
//!
//! struct Clock {
//!     core: ObjectCore,
//!     registration: Registration<Clock, Tick>,
//! }
//!
//! impl Clock {
//!     fn new(name: &str) -> SimResult<Self> {
//!         let registration = Registration::builder("Clock")
//!             .handler(MessageType::new("Tick"), Clock::on_tick)
//!             .sends(MessageType::new("Tick"))
//!             .build()?;
//!         Ok(Clock { core: ObjectCore::new(name), registration })
//!     }
//!
//!     fn on_tick(&mut self, ctx: &mut SimContext<'_, Tick>, _event: &Event<Tick>) -> SimResult<()> {
//!         let me = ctx.id().clone();
//!         ctx.send_event(1.0, &me, &Tick)
//!     }
//! }
//!
//! impl SimulationObject<Tick> for Clock {
//!     fn core(&self) -> &ObjectCore { &self.core }
//!     fn core_mut(&mut self) -> &mut ObjectCore { &mut self.core }
//!     fn registration(&self) -> &Registration<Self, Tick> { &self.registration }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::warn;

use crate::error::{SimError, SimResult};
use crate::event::Event;
use crate::message::MessageType;

use super::context::SimContext;
use super::id::{ObjectHandle, ObjectId};

// ── ClassPriority ─────────────────────────────────────────────────────

/// Priority of a simulation object type among events at the same time.
///
/// Lower values are dispatched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassPriority(u8);

impl ClassPriority {
    pub const HIGH: ClassPriority = ClassPriority(1);
    pub const MEDIUM: ClassPriority = ClassPriority(2);
    pub const LOW: ClassPriority = ClassPriority(3);

    /// Priority of types that do not declare one.
    pub const DEFAULT: ClassPriority = ClassPriority::LOW;

    #[inline]
    pub const fn new(value: u8) -> Self {
        ClassPriority(value)
    }

    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for ClassPriority {
    fn default() -> Self {
        ClassPriority::DEFAULT
    }
}

// ── TypeInfo ──────────────────────────────────────────────────────────

/// The type-erased part of a registration, shared by every instance of a
/// simulation object type and by the events addressed to them.
#[derive(Debug)]
pub struct TypeInfo {
    type_name: &'static str,
    class_priority: ClassPriority,
    priorities: BTreeMap<MessageType, usize>,
    sent: BTreeSet<MessageType>,
}

impl TypeInfo {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn class_priority(&self) -> ClassPriority {
        self.class_priority
    }

    /// Handler priority of a message type; 0 is the highest.
    pub fn priority_of(&self, message_type: MessageType) -> Option<usize> {
        self.priorities.get(&message_type).copied()
    }

    /// Whether this type handles `message_type`.
    pub fn handles(&self, message_type: MessageType) -> bool {
        self.priorities.contains_key(&message_type)
    }

    /// Whether this type may send `message_type`.
    pub fn sends(&self, message_type: MessageType) -> bool {
        self.sent.contains(&message_type)
    }

    pub fn receiving_priorities(&self) -> &BTreeMap<MessageType, usize> {
        &self.priorities
    }

    pub fn sent_types(&self) -> &BTreeSet<MessageType> {
        &self.sent
    }
}

// ── Registration ──────────────────────────────────────────────────────

/// An event handler of simulation object type `T`.
pub type Handler<T, M> = fn(&mut T, &mut SimContext<'_, M>, &Event<M>) -> SimResult<()>;

/// Validated handler table and sent-type set of a simulation object type.
pub struct Registration<T, M> {
    info: Arc<TypeInfo>,
    handlers: BTreeMap<MessageType, Handler<T, M>>,
}

impl<T, M> Registration<T, M> {
    /// Start declaring a simulation object type.
    pub fn builder(type_name: &'static str) -> RegistrationBuilder<T, M> {
        RegistrationBuilder::new(type_name)
    }

    pub fn info(&self) -> &Arc<TypeInfo> {
        &self.info
    }

    pub fn type_name(&self) -> &'static str {
        self.info.type_name
    }

    /// Look up the handler for a message type.
    pub fn handler(&self, message_type: MessageType) -> Option<Handler<T, M>> {
        self.handlers.get(&message_type).copied()
    }

    /// A handle for an object of this type with the given name.
    pub fn handle(&self, id: impl Into<ObjectId>) -> ObjectHandle {
        ObjectHandle::new(id.into(), Arc::clone(&self.info))
    }

    /// Handlers in priority order.
    fn ordered_handlers(&self) -> Vec<(MessageType, Handler<T, M>)> {
        let mut handlers: Vec<_> = self
            .handlers
            .iter()
            .map(|(ty, handler)| (*ty, *handler))
            .collect();
        handlers.sort_by_key(|(ty, _)| self.info.priority_of(*ty));
        handlers
    }
}

impl<T, M> Clone for Registration<T, M> {
    fn clone(&self) -> Self {
        Registration {
            info: Arc::clone(&self.info),
            handlers: self.handlers.clone(),
        }
    }
}

impl<T, M> std::fmt::Debug for Registration<T, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("info", &self.info)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ── RegistrationBuilder ───────────────────────────────────────────────

/// Collects the declarations of a simulation object type.
///
/// Handler priority follows declaration order: inherited handlers first,
/// then the ones declared on this builder.
pub struct RegistrationBuilder<T, M> {
    type_name: &'static str,
    class_priority: ClassPriority,
    handlers: Vec<(MessageType, Handler<T, M>)>,
    sent: Vec<MessageType>,
}

impl<T, M> RegistrationBuilder<T, M> {
    pub fn new(type_name: &'static str) -> Self {
        RegistrationBuilder {
            type_name,
            class_priority: ClassPriority::DEFAULT,
            handlers: Vec::new(),
            sent: Vec::new(),
        }
    }

    /// Inherit a parent type's handlers, sent types and class priority.
    pub fn inherit(mut self, parent: &Registration<T, M>) -> Self {
        let mut handlers = parent.ordered_handlers();
        handlers.append(&mut self.handlers);
        self.handlers = handlers;
        self.sent.extend(parent.info.sent.iter().copied());
        self.class_priority = parent.info.class_priority;
        self
    }

    pub fn class_priority(mut self, class_priority: ClassPriority) -> Self {
        self.class_priority = class_priority;
        self
    }

    /// Declare the handler for `message_type`, at the next lower priority.
    pub fn handler(mut self, message_type: MessageType, handler: Handler<T, M>) -> Self {
        self.handlers.push((message_type, handler));
        self
    }

    /// Declare that this type may send `message_type`.
    pub fn sends(mut self, message_type: MessageType) -> Self {
        self.sent.push(message_type);
        self
    }

    /// Validate the declarations.
    ///
    /// Fails with `DuplicateHandler` if a message type is handled twice and
    /// with `IncompleteRegistration` if the type neither handles nor sends
    /// anything. Declaring only one of the two is allowed but logged.
    pub fn build(self) -> SimResult<Registration<T, M>> {
        let mut handlers = BTreeMap::new();
        let mut priorities = BTreeMap::new();
        for (index, (message_type, handler)) in self.handlers.into_iter().enumerate() {
            if handlers.insert(message_type, handler).is_some() {
                return Err(SimError::DuplicateHandler {
                    type_name: self.type_name,
                    message_type,
                });
            }
            priorities.insert(message_type, index);
        }
        let sent: BTreeSet<MessageType> = self.sent.into_iter().collect();

        if handlers.is_empty() && sent.is_empty() {
            return Err(SimError::IncompleteRegistration(self.type_name));
        } else if handlers.is_empty() {
            warn!(type_name = self.type_name, "simulation object type declares no event handlers");
        } else if sent.is_empty() {
            warn!(type_name = self.type_name, "simulation object type declares no sent message types");
        }

        Ok(Registration {
            info: Arc::new(TypeInfo {
                type_name: self.type_name,
                class_priority: self.class_priority,
                priorities,
                sent,
            }),
            handlers,
        })
    }
}

//! `SimulationObject` trait, its per-instance state, and the type-erased
//! view the engine stores.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::engine::EngineId;
use crate::error::{SimError, SimResult};
use crate::event::Event;
use crate::message::{Message, MessageType};
use crate::time::SimTime;

use super::context::SimContext;
use super::id::{ObjectHandle, ObjectId};
use super::registration::{Registration, TypeInfo};

// ── ObjectCore ────────────────────────────────────────────────────────

/// Per-instance state every simulation object carries: name, local clock,
/// number of batches handled and the engine it belongs to.
#[derive(Debug, Clone)]
pub struct ObjectCore {
    id: ObjectId,
    time: SimTime,
    num_events: u64,
    engine: Option<EngineId>,
}

impl ObjectCore {
    /// A fresh, unregistered object at time 0.
    pub fn new(name: impl Into<ObjectId>) -> Self {
        ObjectCore {
            id: name.into(),
            time: SimTime::ZERO,
            num_events: 0,
            engine: None,
        }
    }

    #[inline]
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    #[inline]
    pub fn time(&self) -> SimTime {
        self.time
    }

    #[inline]
    pub fn num_events(&self) -> u64 {
        self.num_events
    }

    #[inline]
    pub fn engine(&self) -> Option<EngineId> {
        self.engine
    }

    pub(crate) fn attach(&mut self, engine: EngineId) -> SimResult<()> {
        if self.engine.is_some() {
            return Err(SimError::AlreadyRegistered(self.id.clone()));
        }
        self.engine = Some(engine);
        Ok(())
    }

    pub(crate) fn detach(&mut self) {
        self.engine = None;
    }

    /// Move the local clock forward; it may never go back.
    pub(crate) fn advance_to(&mut self, time: SimTime) -> SimResult<()> {
        if time < self.time {
            return Err(SimError::ClockRegression {
                object: self.id.clone(),
                current: self.time,
                requested: time,
            });
        }
        self.time = time;
        Ok(())
    }
}

// ── SimulationObject ──────────────────────────────────────────────────

/// Trait implemented by every simulation object type.
///
/// # Contract
///
/// Implementations **must**:
/// - Not use global mutable state.
/// - Interact with other objects only by sending events through the
///   [`SimContext`] they are given.
/// - Be deterministic for equal inputs.
pub trait SimulationObject<M: Message>: Sized + 'static {
    fn core(&self) -> &ObjectCore;
    fn core_mut(&mut self) -> &mut ObjectCore;

    /// This type's handler table and sent types.
    fn registration(&self) -> &Registration<Self, M>;

    /// Seed the queue. Called once by `SimulationEngine::initialize`.
    fn send_initial_events(&mut self, ctx: &mut SimContext<'_, M>) -> SimResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Application state, for inspection and reports.
    fn get_state(&self) -> String {
        String::new()
    }

    fn name(&self) -> &ObjectId {
        self.core().id()
    }

    fn time(&self) -> SimTime {
        self.core().time()
    }

    fn num_events(&self) -> u64 {
        self.core().num_events()
    }

    /// Handler priority of each message type this type receives.
    fn get_receiving_priorities(&self) -> &BTreeMap<MessageType, usize> {
        self.registration().info().receiving_priorities()
    }
}

// ── AnyObject ─────────────────────────────────────────────────────────

/// Type-erased simulation object, as stored by the engine.
///
/// Implemented for every [`SimulationObject`]. The dispatch entry points
/// take a [`SimContext`], which only the engine can construct.
pub trait AnyObject<M: Message>: Any {
    fn object_core(&self) -> &ObjectCore;
    fn object_core_mut(&mut self) -> &mut ObjectCore;
    fn type_info(&self) -> &Arc<TypeInfo>;

    /// Handle addressing this object in events.
    fn handle(&self) -> ObjectHandle {
        ObjectHandle::new(self.object_core().id().clone(), Arc::clone(self.type_info()))
    }

    fn initial_events(&mut self, ctx: &mut SimContext<'_, M>) -> SimResult<()>;

    /// Handle one batch of concurrent events, already in delivery order.
    fn dispatch_batch(&mut self, ctx: &mut SimContext<'_, M>, events: &[Event<M>]) -> SimResult<()>;

    fn object_state(&self) -> String;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M: Message, T: SimulationObject<M>> AnyObject<M> for T {
    fn object_core(&self) -> &ObjectCore {
        <T as SimulationObject<M>>::core(self)
    }

    fn object_core_mut(&mut self) -> &mut ObjectCore {
        <T as SimulationObject<M>>::core_mut(self)
    }

    fn type_info(&self) -> &Arc<TypeInfo> {
        <T as SimulationObject<M>>::registration(self).info()
    }

    fn initial_events(&mut self, ctx: &mut SimContext<'_, M>) -> SimResult<()> {
        <T as SimulationObject<M>>::send_initial_events(self, ctx)
    }

    fn dispatch_batch(&mut self, ctx: &mut SimContext<'_, M>, events: &[Event<M>]) -> SimResult<()> {
        <T as SimulationObject<M>>::core_mut(self).num_events += 1;

        for event in events {
            trace!(
                time = %event.receive_time(),
                receiver = %event.receiver().id(),
                message = ?event.message(),
                "dispatch"
            );
            let message_type = event.message_type();
            let handler = <T as SimulationObject<M>>::registration(self)
                .handler(message_type)
                .ok_or_else(|| SimError::NoHandlerRegistered {
                    object: event.receiver().id().clone(),
                    message_type,
                })?;
            handler(self, ctx, event)?;
        }
        Ok(())
    }

    fn object_state(&self) -> String {
        <T as SimulationObject<M>>::get_state(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

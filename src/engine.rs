//! Simulation engine: object registry and run loop.
//!
//! The engine owns every simulation object and the event queue. `run`
//! repeatedly pops the next batch of concurrent events, advances the
//! receiver's clock to the batch time and hands the batch to the receiver.
//! The loop is synchronous and single-threaded, so the order of execution
//! is fully determined by the queue order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::message::Message;
use crate::object::{AnyObject, Directory, ObjectId, SimContext, SimulationObject};
use crate::observer::{SimulationObserver, TracingObserver};
use crate::queue::EventQueue;
use crate::time::SimTime;

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an engine, recorded by the objects registered with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EngineId(u64);

impl EngineId {
    fn next() -> Self {
        EngineId(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Objects may be added.
    Unstarted,
    /// Initial events have been sent.
    Initialized,
    /// At least one batch has been dispatched and events remain.
    Running,
    /// The queue ran dry.
    Finished,
    /// An object failed to send its initial events. Only
    /// [`reset`](SimulationEngine::reset) leaves this state.
    Failed,
}

// ── SimulationEngine ──────────────────────────────────────────────────

/// Runs a discrete-event simulation over messages of type `M`.
///
/// Lifecycle: add objects, [`initialize`](Self::initialize), then
/// [`run`](Self::run) or [`step`](Self::step) as often as needed.
/// Calls to `run` may resume where the previous one stopped.
pub struct SimulationEngine<M> {
    id: EngineId,
    objects: BTreeMap<ObjectId, Box<dyn AnyObject<M>>>,
    /// Registration order.
    order: Vec<ObjectId>,
    directory: Directory,
    queue: EventQueue<M>,
    observer: Option<Box<dyn SimulationObserver<M>>>,
    state: EngineState,
    time: SimTime,
    event_count: u64,
    end_time: f64,
}

impl<M: Message> SimulationEngine<M> {
    pub fn new() -> Self {
        SimulationEngine {
            id: EngineId::next(),
            objects: BTreeMap::new(),
            order: Vec::new(),
            directory: Directory::new(),
            queue: EventQueue::new(),
            observer: None,
            state: EngineState::Unstarted,
            time: SimTime::ZERO,
            event_count: 0,
            end_time: f64::INFINITY,
        }
    }

    /// Build an engine from a validated configuration.
    pub fn from_config(config: &SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let mut engine = Self::new();
        engine.end_time = config.end_time;
        if config.trace_events {
            engine.set_observer(TracingObserver::new());
        }
        Ok(engine)
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    /// Replace the observer notified of every scheduled and dispatched event.
    pub fn set_observer(&mut self, observer: impl SimulationObserver<M> + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn SimulationObserver<M>>> {
        self.observer.take()
    }

    // ── Registry ──────────────────────────────────────────────────

    /// Register an object.
    ///
    /// Fails with `DuplicateName` if an object with the same name is
    /// registered, with `AlreadyRegistered` if the object belongs to an
    /// engine, and with `InvalidState` once the engine is initialized.
    pub fn add_object<T: SimulationObject<M>>(&mut self, object: T) -> SimResult<ObjectId> {
        self.add_boxed(Box::new(object))
    }

    /// Register an already boxed object.
    pub fn add_boxed(&mut self, mut object: Box<dyn AnyObject<M>>) -> SimResult<ObjectId> {
        if self.state != EngineState::Unstarted {
            return Err(SimError::InvalidState(format!(
                "objects cannot be added to an engine in state {:?}",
                self.state
            )));
        }
        let id = object.object_core().id().clone();
        if self.objects.contains_key(&id) {
            return Err(SimError::DuplicateName(id));
        }
        object.object_core_mut().attach(self.id)?;

        debug!(object = %id, type_name = object.type_info().type_name(), "object registered");
        self.directory.insert(id.clone(), object.handle());
        self.order.push(id.clone());
        self.objects.insert(id.clone(), object);
        Ok(id)
    }

    /// Register several objects in order, stopping at the first failure.
    /// Objects registered before the failure stay registered.
    pub fn add_objects<I>(&mut self, objects: I) -> SimResult<Vec<ObjectId>>
    where
        I: IntoIterator<Item = Box<dyn AnyObject<M>>>,
    {
        objects.into_iter().map(|object| self.add_boxed(object)).collect()
    }

    /// Unregister an object, dropping the events addressed to it.
    ///
    /// The returned object no longer belongs to any engine.
    pub fn remove_object(&mut self, id: &ObjectId) -> SimResult<Box<dyn AnyObject<M>>> {
        let mut object = self
            .objects
            .remove(id)
            .ok_or_else(|| SimError::UnknownObject(id.clone()))?;
        self.order.retain(|other| other != id);
        self.directory.remove(id);
        self.queue.remove_receiver(id);
        object.object_core_mut().detach();
        debug!(object = %id, "object removed");
        Ok(object)
    }

    /// Drop every object and pending event and return to `Unstarted`.
    pub fn reset(&mut self) {
        self.objects.clear();
        self.order.clear();
        self.directory.clear();
        self.queue.reset();
        self.state = EngineState::Unstarted;
        self.time = SimTime::ZERO;
        self.event_count = 0;
    }

    /// Downcast a registered object for inspection.
    ///
    /// Returns `None` if the name is unknown or the type is wrong.
    pub fn object<T: 'static>(&self, id: &ObjectId) -> Option<&T> {
        self.objects.get(id)?.as_any().downcast_ref::<T>()
    }

    pub fn object_mut<T: 'static>(&mut self, id: &ObjectId) -> Option<&mut T> {
        self.objects.get_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Names of the registered objects, in registration order.
    pub fn object_ids(&self) -> &[ObjectId] {
        &self.order
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Each object's `get_state`, in registration order.
    pub fn object_states(&self) -> Vec<(ObjectId, String)> {
        self.order
            .iter()
            .filter_map(|id| self.objects.get(id).map(|object| (id.clone(), object.object_state())))
            .collect()
    }

    // ── Run control ───────────────────────────────────────────────

    /// Let every object send its initial events, in registration order.
    ///
    /// May be called once. If an object fails, the events already seeded
    /// are dropped and the engine moves to `Failed`, so no object's hook
    /// runs twice.
    pub fn initialize(&mut self) -> SimResult<()> {
        if self.state != EngineState::Unstarted {
            return Err(SimError::InvalidState(format!(
                "initialize called on an engine in state {:?}",
                self.state
            )));
        }
        if let Err(e) = self.send_initial_events() {
            self.queue.reset();
            self.state = EngineState::Failed;
            warn!(error = %e, "simulation initialization failed");
            return Err(e);
        }
        self.state = EngineState::Initialized;
        info!(objects = self.objects.len(), pending = self.queue.len(), "simulation initialized");
        Ok(())
    }

    fn send_initial_events(&mut self) -> SimResult<()> {
        for id in &self.order {
            let object = self
                .objects
                .get_mut(id)
                .ok_or_else(|| SimError::UnknownObject(id.clone()))?;
            let now = object.object_core().time();
            let mut ctx = SimContext::new(
                &mut self.queue,
                &self.directory,
                self.observer.as_deref_mut(),
                object.handle(),
                now,
            );
            object.initial_events(&mut ctx)?;
        }
        Ok(())
    }

    /// Dispatch every event with a time `<= end_time`.
    ///
    /// Returns the number of events dispatched by this call. Stops early,
    /// leaving the engine paused, if a handler fails. The rest of the
    /// failing batch is not re-queued and the batch is not counted in
    /// [`event_count`](Self::event_count), although the receiver's clock
    /// and `num_events` have already advanced.
    pub fn run(&mut self, end_time: f64) -> SimResult<u64> {
        if end_time.is_nan() {
            return Err(SimError::InvalidTime("end_time is NaN".into()));
        }
        let end = SimTime::new(end_time)?;
        match self.state {
            EngineState::Unstarted | EngineState::Failed => {
                return Err(SimError::InvalidState(format!("run called in state {:?}", self.state)));
            }
            EngineState::Finished => return Ok(0),
            EngineState::Initialized | EngineState::Running => {}
        }

        info!(time = %self.time, end_time = %end, pending = self.queue.len(), "simulation run started");
        let start = self.event_count;
        loop {
            if self.queue.is_empty() {
                self.state = EngineState::Finished;
                break;
            }
            if self.queue.peek_time() > end {
                break;
            }
            self.dispatch_next_batch()?;
        }

        let dispatched = self.event_count - start;
        info!(
            time = %self.time,
            dispatched,
            total = self.event_count,
            pending = self.queue.len(),
            "simulation run finished"
        );
        Ok(dispatched)
    }

    /// [`run`](Self::run) to the configured end time.
    pub fn run_configured(&mut self) -> SimResult<u64> {
        self.run(self.end_time)
    }

    /// Dispatch the next batch only. Returns the number of events in it.
    pub fn step(&mut self) -> SimResult<usize> {
        match self.state {
            EngineState::Unstarted | EngineState::Failed => {
                Err(SimError::InvalidState(format!("step called in state {:?}", self.state)))
            }
            EngineState::Finished => Ok(0),
            EngineState::Initialized | EngineState::Running => {
                if self.queue.is_empty() {
                    self.state = EngineState::Finished;
                    return Ok(0);
                }
                self.dispatch_next_batch()
            }
        }
    }

    fn dispatch_next_batch(&mut self) -> SimResult<usize> {
        let batch = self.queue.pop_next_batch();
        let Some(first) = batch.first() else {
            return Ok(0);
        };
        let time = first.receive_time();
        let receiver = first.receiver().id().clone();
        self.state = EngineState::Running;

        let object = self
            .objects
            .get_mut(&receiver)
            .ok_or_else(|| SimError::UnknownObject(receiver.clone()))?;
        object.object_core_mut().advance_to(time)?;
        self.time = time;

        if let Some(observer) = self.observer.as_deref_mut() {
            for event in &batch {
                observer.on_dispatch(event);
            }
        }
        let mut ctx = SimContext::new(
            &mut self.queue,
            &self.directory,
            self.observer.as_deref_mut(),
            object.handle(),
            time,
        );
        object.dispatch_batch(&mut ctx, &batch)?;
        self.event_count += batch.len() as u64;
        Ok(batch.len())
    }

    // ── Accessors ─────────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Time of the most recently dispatched batch.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Events dispatched since construction or the last reset.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Time of the next pending event, or infinity.
    pub fn next_event_time(&self) -> SimTime {
        self.queue.peek_time()
    }

    pub fn queue(&self) -> &EventQueue<M> {
        &self.queue
    }

    /// Table of the pending events, if any.
    pub fn render_queue(&self) -> Option<String> {
        self.queue.render(None)
    }
}

impl<M: Message> Default for SimulationEngine<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> std::fmt::Debug for SimulationEngine<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("id", &self.id)
            .field("objects", &self.order)
            .field("state", &self.state)
            .field("time", &self.time)
            .field("event_count", &self.event_count)
            .field("pending", &self.queue.len())
            .finish()
    }
}

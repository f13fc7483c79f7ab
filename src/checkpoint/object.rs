//! The periodic checkpoint object and its hooks.

use tracing::debug;

use crate::error::SimResult;
use crate::message::Message;
use crate::object::{ObjectId, SimContext};
use crate::template::{NextEvent, PeriodicAction, PeriodicObject};
use crate::time::SimTime;

use super::store::CheckpointStore;
use super::{Checkpoint, CheckpointState};

/// Called once per checkpoint period with the current simulated time.
pub trait CreateCheckpoint: 'static {
    fn create_checkpoint(&mut self, time: SimTime) -> SimResult<()>;
}

impl<F> CreateCheckpoint for F
where
    F: FnMut(SimTime) -> SimResult<()> + 'static,
{
    fn create_checkpoint(&mut self, time: SimTime) -> SimResult<()> {
        (self)(time)
    }
}

/// Periodic action that creates a checkpoint.
#[derive(Debug, Clone)]
pub struct Checkpointing<C> {
    creator: C,
}

impl<C: CreateCheckpoint, M: Message> PeriodicAction<M> for Checkpointing<C> {
    const TYPE_NAME: &'static str = "CheckpointObject";

    fn on_period(&mut self, now: SimTime, ctx: &mut SimContext<'_, M>) -> SimResult<()> {
        debug!(object = %ctx.id(), time = %now, "creating checkpoint");
        self.creator.create_checkpoint(now)
    }
}

/// Creates a checkpoint at `0, period, 2·period, …`.
pub type CheckpointObject<C, M> = PeriodicObject<Checkpointing<C>, M>;

impl<C, M> PeriodicObject<Checkpointing<C>, M>
where
    C: CreateCheckpoint,
    M: Message + From<NextEvent>,
{
    /// Fails with `InvalidPeriod` unless `period` is finite and positive.
    pub fn checkpointing(name: impl Into<ObjectId>, period: f64, creator: C) -> SimResult<Self> {
        Self::new(name, period, Checkpointing { creator })
    }

    pub fn creator(&self) -> &C {
        &self.action().creator
    }

    pub fn creator_mut(&mut self) -> &mut C {
        &mut self.action_mut().creator
    }
}

// ── StateCheckpointer ─────────────────────────────────────────────────

/// Saves the provider's state, paired with its random state and the
/// current time, to a store.
#[derive(Debug, Clone)]
pub struct StateCheckpointer<P, S> {
    provider: P,
    store: S,
}

impl<P, S> StateCheckpointer<P, S> {
    pub fn new(provider: P, store: S) -> Self {
        StateCheckpointer { provider, store }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<P, S> CreateCheckpoint for StateCheckpointer<P, S>
where
    P: CheckpointState + 'static,
    S: CheckpointStore<P::Snapshot> + 'static,
{
    fn create_checkpoint(&mut self, time: SimTime) -> SimResult<()> {
        let checkpoint = Checkpoint {
            time,
            state: self.provider.get_checkpoint_state(time),
            random_state: self.provider.get_random_state(),
        };
        self.store.save(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::checkpoint::{list_checkpoints, MemoryStore, RngSnapshot};
    use crate::engine::SimulationEngine;
    use crate::error::SimError;
    use crate::message::testing::TestMsg;
    use crate::object::SimulationObject;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Constant(u32);

    impl CheckpointState for Constant {
        type Snapshot = u32;

        fn get_checkpoint_state(&self, _time: SimTime) -> u32 {
            self.0
        }

        fn get_random_state(&self) -> Option<RngSnapshot> {
            Some(RngSnapshot::capture(&ChaCha8Rng::seed_from_u64(u64::from(self.0))))
        }
    }

    #[test]
    fn test_invalid_period() {
        let result = CheckpointObject::<_, TestMsg>::checkpointing("c", 0.0, |_: SimTime| -> SimResult<()> { Ok(()) });
        assert!(matches!(result, Err(SimError::InvalidPeriod(p)) if p == 0.0));
        let result = CheckpointObject::<_, TestMsg>::checkpointing("c", -2.0, |_: SimTime| -> SimResult<()> { Ok(()) });
        assert!(matches!(result, Err(SimError::InvalidPeriod(_))));
    }

    #[test]
    fn test_closure_creator() {
        let times = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&times);
        let object = CheckpointObject::<_, TestMsg>::checkpointing("c", 4.0, move |t: SimTime| -> SimResult<()> {
            sink.borrow_mut().push(t.value());
            Ok(())
        })
        .unwrap();
        assert_eq!(object.registration().type_name(), "CheckpointObject");

        let mut engine = SimulationEngine::<TestMsg>::new();
        engine.add_object(object).unwrap();
        engine.initialize().unwrap();
        engine.run(13.0).unwrap();
        assert_eq!(*times.borrow(), vec![0.0, 4.0, 8.0, 12.0]);
    }

    #[test]
    fn test_state_checkpointer() {
        let store = Rc::new(RefCell::new(MemoryStore::<u32>::new()));
        let creator = StateCheckpointer::new(Constant(5), Rc::clone(&store));
        let mut engine = SimulationEngine::<TestMsg>::new();
        engine
            .add_object(CheckpointObject::checkpointing("c", 10.0, creator).unwrap())
            .unwrap();
        engine.initialize().unwrap();
        engine.run(30.0).unwrap();

        let times: Vec<f64> = list_checkpoints::<u32>(&store).unwrap().iter().map(|t| t.value()).collect();
        assert_eq!(times, vec![0.0, 10.0, 20.0, 30.0]);
        let store = store.borrow();
        let first = store.iter().next().unwrap();
        assert_eq!(first.state, 5);
        assert_eq!(
            first.random_state.unwrap().restore().get_seed(),
            ChaCha8Rng::seed_from_u64(5).get_seed()
        );
    }

    #[test]
    fn test_creator_error_aborts_run() {
        let object = CheckpointObject::<_, TestMsg>::checkpointing("c", 1.0, |t: SimTime| -> SimResult<()> {
            if t.value() >= 2.0 {
                Err(SimError::InvalidState("disk full".into()))
            } else {
                Ok(())
            }
        })
        .unwrap();
        let mut engine = SimulationEngine::<TestMsg>::new();
        engine.add_object(object).unwrap();
        engine.initialize().unwrap();
        assert!(matches!(engine.run(5.0), Err(SimError::InvalidState(_))));
    }
}

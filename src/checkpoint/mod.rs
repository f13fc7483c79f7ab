//! Periodic checkpoints of externally owned simulation state.
//!
//! A [`CheckpointObject`] is a periodic object whose action calls a
//! [`CreateCheckpoint`] hook at `0, period, 2·period, …`. The usual hook is
//! a [`StateCheckpointer`], which asks a [`CheckpointState`] provider for a
//! snapshot and saves it to a [`CheckpointStore`]. Stored checkpoints are
//! queried with [`list_checkpoints`] and [`get_checkpoint`].
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`object`] | [`CreateCheckpoint`], [`Checkpointing`], [`CheckpointObject`], [`StateCheckpointer`] |
//! | [`store`] | [`CheckpointStore`], [`MemoryStore`], [`DirectoryStore`] |
//! | [`rng`] | [`RngSnapshot`] |

pub mod object;
pub mod rng;
pub mod store;

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::time::SimTime;

pub use object::{CheckpointObject, Checkpointing, CreateCheckpoint, StateCheckpointer};
pub use rng::RngSnapshot;
pub use store::{CheckpointStore, DirectoryStore, MemoryStore};

/// A snapshot of simulation state at one simulated time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    pub time: SimTime,
    pub state: S,
    pub random_state: Option<RngSnapshot>,
}

/// Application state that can be checkpointed.
pub trait CheckpointState {
    type Snapshot;

    /// Snapshot of the state at `time`.
    fn get_checkpoint_state(&self, time: SimTime) -> Self::Snapshot;

    /// State of the random-number generator driving the simulation, if any.
    fn get_random_state(&self) -> Option<RngSnapshot> {
        None
    }
}

impl<T: CheckpointState> CheckpointState for Rc<RefCell<T>> {
    type Snapshot = T::Snapshot;

    fn get_checkpoint_state(&self, time: SimTime) -> Self::Snapshot {
        self.borrow().get_checkpoint_state(time)
    }

    fn get_random_state(&self) -> Option<RngSnapshot> {
        self.borrow().get_random_state()
    }
}

/// Times of all checkpoints in `store`, ascending.
pub fn list_checkpoints<S>(store: &impl CheckpointStore<S>) -> SimResult<Vec<SimTime>> {
    store.times()
}

/// The latest checkpoint at or before `time`, or the latest of all if
/// `time` is `None`.
///
/// Fails with `NoCheckpoint` if there is none, and with `InvalidTime` if
/// `time` is NaN.
pub fn get_checkpoint<S>(store: &impl CheckpointStore<S>, time: Option<f64>) -> SimResult<Checkpoint<S>> {
    let times = store.times()?;
    let found = match time {
        None => times.last().copied(),
        Some(time) => {
            let time = SimTime::new(time)?;
            times.iter().rev().find(|t| **t <= time).copied()
        }
    };
    match found {
        Some(at) => store.load(at),
        None => Err(SimError::NoCheckpoint(match time {
            Some(time) => SimTime::new(time)?,
            None => SimTime::INFINITY,
        })),
    }
}

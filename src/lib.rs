//! # desim: Deterministic Discrete-Event Simulation
//!
//! A sequential simulation kernel. Simulation objects exchange typed
//! messages through events; the engine dispatches them in a total order
//! so that every run of the same model produces the same trace.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────┐
//! │      SimulationEngine       │ ← registry + run loop
//! │  ┌───────────────────────┐  │
//! │  │      EventQueue       │  │ ← min-heap, batches concurrent events
//! │  └───────────────────────┘  │
//! │  ┌───────────────────────┐  │
//! │  │   SimulationObjects   │  │ ← registered handlers, own clock
//! │  │  PeriodicObject       │  │ ← fixed-period template
//! │  │  CheckpointObject     │  │ ← periodic checkpoints
//! │  └───────────────────────┘  │
//! │  ┌───────────────────────┐  │
//! │  │   SimTime / Event     │  │ ← NaN-free time, immutable events
//! │  └───────────────────────┘  │
//! └─────────────────────────────┘
//! ```

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod message;
pub mod object;
pub mod observer;
pub mod queue;
pub mod template;
pub mod time;

// Re-exports for convenience.
pub use checkpoint::{
    get_checkpoint, list_checkpoints, Checkpoint, CheckpointObject, CheckpointState, CheckpointStore, Checkpointing,
    CreateCheckpoint, DirectoryStore, MemoryStore, RngSnapshot, StateCheckpointer,
};
pub use config::{init_tracing, CheckpointConfig, LoggingConfig, SimulationConfig};
pub use engine::{EngineId, EngineState, SimulationEngine};
pub use error::{SimError, SimResult};
pub use event::Event;
pub use message::{Message, MessageType};
pub use object::{
    AnyObject, ClassPriority, ObjectCore, ObjectHandle, ObjectId, Registration, SimContext, SimulationObject,
};
pub use observer::{SimulationObserver, TraceEntry, TraceRecorder, TracingObserver};
pub use queue::EventQueue;
pub use template::{NextEvent, PeriodicAction, PeriodicObject};
pub use time::SimTime;

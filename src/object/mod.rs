//! Simulation objects: identity, type declarations and dispatch.
//!
//! Objects never share memory; all interaction goes through events
//! scheduled via [`SimContext`].
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`ObjectId`], [`ObjectHandle`] |
//! | [`registration`] | [`ClassPriority`], [`Registration`], [`RegistrationBuilder`], [`TypeInfo`] |
//! | [`traits`] | [`SimulationObject`], [`AnyObject`], [`ObjectCore`] |
//! | [`context`] | [`SimContext`] (send API) |

pub mod context;
pub mod id;
pub mod registration;
pub mod traits;

pub use context::SimContext;
pub(crate) use context::Directory;
pub use id::{ObjectHandle, ObjectId};
pub use registration::{ClassPriority, Handler, Registration, RegistrationBuilder, TypeInfo};
pub use traits::{AnyObject, ObjectCore, SimulationObject};

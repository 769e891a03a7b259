//! Hydro monitor field node library.
//!
//! Exposes the control loops, their runtime primitives and the concrete
//! adapters so integration tests can run a whole node against mock
//! collaborators.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod node;
pub mod runtime;
pub mod sensors;

pub use error::{Error, Result};

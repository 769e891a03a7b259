//! Application core: the control loops and the data they exchange.
//!
//! Each loop owns its own timer and inbox and talks to the others only
//! through [`Mailbox`](crate::runtime::Mailbox)es. All interaction with
//! hardware and the network happens through **port traits** defined in
//! [`ports`], keeping this layer testable without real peripherals.

pub mod analyzer;
pub mod cleaner;
pub mod measurer;
pub mod model;
pub mod poller;
pub mod ports;
pub mod trigger;

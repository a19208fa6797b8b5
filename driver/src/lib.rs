//! # Kitty driver
//!
//! This defines the boundary between the kitty interpreter and whatever actually moves
//! servos or lights LEDs, as well as the definitions that both sides need to share, such
//! as the device action type and driver errors.
//!
//! The interpreter only ever describes what it wants done through a [`DeviceAction`].
//! Anything implementing [`ActionSink`] can receive those actions.
#![warn(missing_docs)]

/// Device actions handed from the interpreter to a driver
pub mod action;
/// Errors a driver can report back
pub mod error;
/// The synchronous driver interface and a recording implementation
pub mod sink;
/// A driver that simulates device state in memory
pub mod simulated;
/// Bridges the synchronous interface to an asynchronous driver task
pub mod channel;

pub use action::{ActionKind, DeviceAction, DeviceKind};
pub use channel::{serve_driver, spawn_driver_task, AsyncActionSink, ChannelSink, DriverRequest};
pub use error::DriverError;
pub use sink::{ActionSink, RecordingSink};
pub use simulated::{SimulatedDriver, SimulatorSettings};

//! Application core: pure domain logic, zero I/O.
//!
//! Operator commands, status events and the [`service::PumpController`]
//! that ties them to the control state.  All interaction with hardware
//! and the broker happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

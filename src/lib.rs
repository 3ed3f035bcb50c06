//! TankPump firmware library.
//!
//! Exposes the pure-logic modules for integration testing and for the
//! binary in `main.rs`. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod pins;
pub mod sensors;

pub mod adapters;
pub mod drivers;

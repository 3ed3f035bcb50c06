//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PumpController / SensingLoop (domain)
//! ```
//!
//! Driven adapters (ranging sensor, relay/LED outputs, status sinks, clock)
//! implement these traits.  The domain consumes them via generics, so the
//! control core never touches hardware directly and runs unchanged against
//! the mocks in `tests/integration/mock_hw.rs`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::app::events::StatusEvent;
use crate::sensors::DistanceSample;

// ───────────────────────────────────────────────────────────────
// Ranging port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One distance measurement per call.
///
/// Implementations must bound every hardware wait; a measurement that
/// cannot complete yields a non-`Valid` sample instead of blocking.
pub trait RangingPort {
    fn measure(&mut self) -> DistanceSample;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic microsecond counter used to time echo pulses.
pub trait Clock {
    fn now_us(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the controller's outputs.
///
/// Called only while the control-state lock is held, so implementations
/// must be plain register writes: no logging of their own, no blocking.
pub trait ActuatorPort {
    /// Energise or release the pump relay.  The pump-status LED follows
    /// in the same call so the two can never disagree.
    fn set_pump(&mut self, on: bool);

    /// Mode indicator LED: lit in automatic mode.
    fn set_mode_indicator(&mut self, automatic: bool);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → MQTT / logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits [`StatusEvent`]s through this port.  Adapters decide
/// where they go (MQTT status topics, serial log, both).
pub trait EventSink {
    fn emit(&mut self, event: &StatusEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &StatusEvent) {
        (**self).emit(event);
    }
}

/// Fan-out: every event goes to both sinks, left first.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &StatusEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

/// Cloneable handle that lets several execution contexts publish through
/// one sink (the MQTT event thread and the sensing loop share a client).
pub struct SharedSink<S>(Arc<Mutex<S>>);

impl<S> SharedSink<S> {
    pub fn new(sink: S) -> Self {
        Self(Arc::new(Mutex::new(sink)))
    }

    /// Direct access to the wrapped sink (e.g. to subscribe through the
    /// same MQTT client).  Poisoning is recovered.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<S: EventSink> EventSink for SharedSink<S> {
    fn emit(&mut self, event: &StatusEvent) {
        self.lock().emit(event);
    }
}

//! Periodic sensing loop.
//!
//! ```text
//!            ┌──────────── every period ────────────┐
//!            ▼                                      │
//!   read mode ──▶ ModeEdge ──▶ Manual?  ── yes ──▶ idle (Inactive once per edge)
//!                                 │ no
//!                                 ▼
//!                          measure() (no lock held)
//!                                 ▼
//!                 evaluate() (one lock: decide + apply)
//!                                 ▼
//!                      publish distance status ─────┘
//! ```

use std::time::Duration;

use log::{info, warn};

use crate::app::events::{DistanceStatus, StatusEvent};
use crate::app::ports::{ActuatorPort, EventSink, RangingPort};
use crate::app::service::PumpController;
use crate::control::hysteresis::PumpTransition;
use crate::control::state::Mode;
use crate::sensors::DistanceSample;

// ───────────────────────────────────────────────────────────────
// Mode edge detector
// ───────────────────────────────────────────────────────────────

/// A change of mode observed between two sensing periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    EnteredAutomatic,
    EnteredManual,
}

/// Remembers the mode seen on the previous period.
#[derive(Debug, Clone, Copy)]
pub struct ModeEdge {
    last: Mode,
}

impl ModeEdge {
    /// Seed with the boot mode so startup is not reported as an edge.
    pub fn new(initial: Mode) -> Self {
        Self { last: initial }
    }

    pub fn observe(&mut self, mode: Mode) -> Option<ModeChange> {
        if mode == self.last {
            return None;
        }
        self.last = mode;
        Some(match mode {
            Mode::Automatic => ModeChange::EnteredAutomatic,
            Mode::Manual => ModeChange::EnteredManual,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// SensingLoop
// ───────────────────────────────────────────────────────────────

/// What one call to [`SensingLoop::run_cycle`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Manual mode: nothing measured.
    Paused,
    /// Automatic mode: a sample was taken and evaluated.
    Measured {
        sample: DistanceSample,
        transition: Option<PumpTransition>,
    },
}

pub struct SensingLoop<R> {
    ranging: R,
    edge: ModeEdge,
    period: Duration,
}

impl<R: RangingPort> SensingLoop<R> {
    pub fn new(ranging: R, initial_mode: Mode, period_ms: u32) -> Self {
        Self {
            ranging,
            edge: ModeEdge::new(initial_mode),
            period: Duration::from_millis(u64::from(period_ms)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One sensing period.  Never holds the controller lock while the
    /// sensor is waiting on the echo line.
    pub fn run_cycle<A: ActuatorPort>(
        &mut self,
        controller: &PumpController<A>,
        sink: &mut impl EventSink,
    ) -> CycleOutcome {
        let mode = controller.mode();

        match self.edge.observe(mode) {
            Some(ModeChange::EnteredManual) => {
                warn!("Manual mode: sensing paused");
                sink.emit(&StatusEvent::Distance(DistanceStatus::Inactive));
            }
            Some(ModeChange::EnteredAutomatic) => info!("Automatic mode: sensing resumed"),
            None => {}
        }

        if !mode.is_automatic() {
            return CycleOutcome::Paused;
        }

        let sample = self.ranging.measure();
        let transition = controller.evaluate(sample, sink);
        sink.emit(&StatusEvent::Distance(sample.into()));

        CycleOutcome::Measured { sample, transition }
    }

    /// Run forever, sleeping one period after each cycle.
    pub fn run<A: ActuatorPort>(
        mut self,
        controller: &PumpController<A>,
        mut sink: impl EventSink,
    ) -> ! {
        info!("Sensing loop started (period {} ms)", self.period.as_millis());
        loop {
            self.run_cycle(controller, &mut sink);
            std::thread::sleep(self.period);
        }
    }
}

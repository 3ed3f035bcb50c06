//! Dual-threshold on/off decision.
//!
//! ```text
//!   pump OFF ──(distance > on_cm)──▶ pump ON
//!   pump ON  ──(distance < off_cm)─▶ pump OFF
//! ```
//!
//! Crossing a threshold while already in the matching state does nothing,
//! which keeps the relay from chattering around a single boundary.  Both
//! comparisons are strict: a reading exactly on a threshold never switches.

use crate::control::state::ControlState;
use crate::sensors::DistanceSample;

/// A change of pump output requested by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpTransition {
    TurnOn,
    TurnOff,
}

impl PumpTransition {
    /// The `pump_on` value after this transition.
    pub fn target(self) -> bool {
        matches!(self, Self::TurnOn)
    }
}

/// Decide the next pump transition for `sample`, if any.
///
/// Pure: the caller applies the result to the actuator and to
/// `ControlState::pump_on`.  Returns `None` in manual mode and for any
/// sample that is not [`DistanceSample::Valid`].
pub fn decide(state: &ControlState, sample: DistanceSample) -> Option<PumpTransition> {
    if !state.mode.is_automatic() {
        return None;
    }
    let DistanceSample::Valid(distance_cm) = sample else {
        return None;
    };

    if !state.pump_on && distance_cm > state.threshold_on_cm {
        Some(PumpTransition::TurnOn)
    } else if state.pump_on && distance_cm < state.threshold_off_cm {
        Some(PumpTransition::TurnOff)
    } else {
        None
    }
}

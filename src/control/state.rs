//! The shared control record.
//!
//! `ControlState` is the single blackboard both execution contexts work
//! against: the sensing loop (automatic pump decisions) and the MQTT event
//! thread (operator commands).  It is never accessed directly across
//! threads; [`PumpController`](crate::app::service::PumpController) keeps it
//! behind a mutex together with the actuator port.

use serde::{Deserialize, Serialize};

use crate::config::ControlConfig;

/// Who governs the pump output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// The hysteresis controller decides from distance readings.
    Automatic,
    /// Only explicit pump commands change the output; sensing is paused.
    Manual,
}

impl Mode {
    /// Wire representation used on the mode status topic.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "AUTOMATICO",
            Self::Manual => "MANUAL",
        }
    }

    pub fn is_automatic(self) -> bool {
        matches!(self, Self::Automatic)
    }
}

/// Which of the two hysteresis thresholds a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    /// Distance above which the pump turns on.
    On,
    /// Distance below which the pump turns off.
    Off,
}

/// Snapshot of the controller's mutable state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    pub mode: Mode,
    /// Authoritative pump state; relay and pump LED always mirror it.
    pub pump_on: bool,
    /// Always `> 0`.
    pub threshold_on_cm: f32,
    /// Always `> 0`.
    pub threshold_off_cm: f32,
}

impl Default for ControlState {
    fn default() -> Self {
        Self::from_config(&ControlConfig::default())
    }
}

impl ControlState {
    /// Boot state: pump off, mode and thresholds from configuration.
    pub fn from_config(config: &ControlConfig) -> Self {
        Self {
            mode: config.initial_mode,
            pump_on: false,
            threshold_on_cm: config.threshold_on_cm,
            threshold_off_cm: config.threshold_off_cm,
        }
    }

    pub fn threshold(&self, kind: ThresholdKind) -> f32 {
        match kind {
            ThresholdKind::On => self.threshold_on_cm,
            ThresholdKind::Off => self.threshold_off_cm,
        }
    }

    /// Store a new threshold.  Returns `false` (and keeps the previous
    /// value) unless `value_cm` is finite and strictly positive.
    pub fn set_threshold(&mut self, kind: ThresholdKind, value_cm: f32) -> bool {
        if !is_valid_threshold(value_cm) {
            return false;
        }
        match kind {
            ThresholdKind::On => self.threshold_on_cm = value_cm,
            ThresholdKind::Off => self.threshold_off_cm = value_cm,
        }
        true
    }
}

/// A threshold must be a finite, strictly positive distance.
pub fn is_valid_threshold(value_cm: f32) -> bool {
    value_cm.is_finite() && value_cm > 0.0
}

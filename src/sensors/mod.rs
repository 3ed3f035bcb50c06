//! Distance sensing.
//!
//! One sensor today: the HC-SR04 style ultrasonic ranger in
//! [`ultrasonic`].  Every measurement ends in a [`DistanceSample`]; none of
//! the failure branches is fatal.

pub mod ultrasonic;

use crate::config::SensorConfig;

/// Result of a single ranging attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceSample {
    /// Distance in centimetres, strictly inside the configured range.
    Valid(f32),
    /// An echo was timed but the distance is outside the valid range.
    OutOfRange,
    /// No echo edge arrived within the timeout (or the lines failed).
    Timeout,
}

impl DistanceSample {
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Convert an echo pulse width into a sample.
///
/// `distance = duration × speed / 2`; valid only when
/// `min_distance_cm < distance < max_distance_cm`.
pub fn classify(pulse_us: u64, cfg: &SensorConfig) -> DistanceSample {
    let distance_cm = pulse_us as f32 * cfg.speed_of_sound_cm_per_us / 2.0;
    if distance_cm > cfg.min_distance_cm && distance_cm < cfg.max_distance_cm {
        DistanceSample::Valid(distance_cm)
    } else {
        DistanceSample::OutOfRange
    }
}

//! Outbound status events.
//!
//! The controller and the sensing loop emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them: publish to MQTT status topics, log to
//! serial, or both.

use core::fmt::Write as _;

use crate::control::state::{Mode, ThresholdKind};
use crate::sensors::DistanceSample;

/// Capacity of a status payload.  `f32::MAX` at one decimal is 41 bytes,
/// the longest marker 28.
pub const PAYLOAD_CAPACITY: usize = 48;

/// Stack buffer holding one formatted status payload.
pub type Payload = heapless::String<PAYLOAD_CAPACITY>;

/// Structured status emitted by the control core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusEvent {
    /// Current mode (startup snapshot or after a mode command).
    Mode(Mode),
    /// Current pump output (startup snapshot or after any switch).
    Pump(bool),
    /// Outcome of a sensing cycle, or a sensing-paused marker.
    Distance(DistanceStatus),
    /// A threshold now in force after an operator update.
    Threshold { kind: ThresholdKind, value_cm: f32 },
}

/// What the distance status topic currently shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceStatus {
    /// A valid reading in centimetres.
    Reading(f32),
    /// The echo came back but the distance is outside the sensor's range.
    OutOfRange,
    /// No echo edge within the timeout.
    NoEcho,
    /// Automatic mode, no cycle completed yet since (re)connect.
    Waiting,
    /// Manual mode: sensing is suspended.
    Inactive,
}

pub const OUT_OF_RANGE_MARKER: &str = "Fora de alcance";
pub const NO_ECHO_MARKER: &str = "Sem eco (timeout)";
pub const WAITING_MARKER: &str = "Aguardando leitura...";
pub const INACTIVE_MARKER: &str = "Sensor inativo (modo manual)";

pub const PUMP_ON_PAYLOAD: &str = "LIGADA";
pub const PUMP_OFF_PAYLOAD: &str = "DESLIGADA";

impl From<DistanceSample> for DistanceStatus {
    fn from(sample: DistanceSample) -> Self {
        match sample {
            DistanceSample::Valid(cm) => Self::Reading(cm),
            DistanceSample::OutOfRange => Self::OutOfRange,
            DistanceSample::Timeout => Self::NoEcho,
        }
    }
}

impl StatusEvent {
    /// Wire payload for this event.
    pub fn payload(&self) -> Payload {
        let mut out = Payload::new();
        match self {
            Self::Mode(mode) => push(&mut out, mode.as_str()),
            Self::Pump(on) => push(&mut out, pump_payload(*on)),
            Self::Distance(DistanceStatus::Reading(cm)) | Self::Threshold { value_cm: cm, .. } => {
                one_decimal(&mut out, *cm);
            }
            Self::Distance(status) => push(&mut out, status.marker()),
        }
        out
    }
}

impl DistanceStatus {
    fn marker(self) -> &'static str {
        match self {
            Self::OutOfRange => OUT_OF_RANGE_MARKER,
            Self::NoEcho => NO_ECHO_MARKER,
            Self::Waiting => WAITING_MARKER,
            Self::Inactive => INACTIVE_MARKER,
            Self::Reading(_) => "",
        }
    }
}

pub fn pump_payload(on: bool) -> &'static str {
    if on { PUMP_ON_PAYLOAD } else { PUMP_OFF_PAYLOAD }
}

fn push(out: &mut Payload, s: &str) {
    let pushed = out.push_str(s);
    debug_assert!(pushed.is_ok(), "payload {s:?} exceeds {PAYLOAD_CAPACITY} bytes");
    if pushed.is_err() {
        out.clear();
    }
}

fn one_decimal(out: &mut Payload, value: f32) {
    if write!(out, "{value:.1}").is_err() {
        out.clear();
    }
}

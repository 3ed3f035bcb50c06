//! Inbound operator commands.
//!
//! MQTT messages on the four command topics are decoded into a
//! [`Command`] that [`PumpController`](super::service::PumpController)
//! applies.  Topics are matched exactly against [`TopicConfig`]; payloads
//! that make no sense for their topic decode to nothing.

use log::warn;

use crate::config::TopicConfig;
use crate::control::state::{Mode, ThresholdKind, is_valid_threshold};

pub const AUTOMATIC_PAYLOAD: &[u8] = b"AUTOMATICO";
pub const PUMP_ON_COMMAND: &[u8] = b"LIGAR";
pub const PUMP_OFF_COMMAND: &[u8] = b"DESLIGAR";

/// A decoded operator request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Switch between automatic and manual control.
    SetMode(Mode),
    /// Manual pump switch (`true` = on).  Ignored in automatic mode.
    SetPump(bool),
    /// New on-threshold in centimetres.
    SetOnThreshold(f32),
    /// New off-threshold in centimetres.
    SetOffThreshold(f32),
}

impl Command {
    /// Threshold commands carry which threshold they target.
    pub fn threshold(self) -> Option<(ThresholdKind, f32)> {
        match self {
            Self::SetOnThreshold(v) => Some((ThresholdKind::On, v)),
            Self::SetOffThreshold(v) => Some((ThresholdKind::Off, v)),
            _ => None,
        }
    }
}

/// Maps (topic, payload) pairs onto [`Command`]s.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    topics: TopicConfig,
}

impl CommandDecoder {
    pub fn new(topics: TopicConfig) -> Self {
        Self { topics }
    }

    pub fn topics(&self) -> &TopicConfig {
        &self.topics
    }

    /// Decode one inbound message.  Unknown topics and unusable payloads
    /// return `None`.
    pub fn decode(&self, topic: &str, payload: &[u8]) -> Option<Command> {
        let t = &self.topics;
        if topic == t.mode_command {
            Some(Command::SetMode(decode_mode(payload)))
        } else if topic == t.pump_command {
            decode_pump(payload).map(Command::SetPump)
        } else if topic == t.on_threshold_command {
            decode_threshold(ThresholdKind::On, payload).map(Command::SetOnThreshold)
        } else if topic == t.off_threshold_command {
            decode_threshold(ThresholdKind::Off, payload).map(Command::SetOffThreshold)
        } else {
            None
        }
    }
}

/// Anything other than the exact automatic keyword selects manual mode.
fn decode_mode(payload: &[u8]) -> Mode {
    if payload == AUTOMATIC_PAYLOAD {
        Mode::Automatic
    } else {
        Mode::Manual
    }
}

fn decode_pump(payload: &[u8]) -> Option<bool> {
    match payload {
        PUMP_ON_COMMAND => Some(true),
        PUMP_OFF_COMMAND => Some(false),
        _ => None,
    }
}

fn decode_threshold(kind: ThresholdKind, payload: &[u8]) -> Option<f32> {
    let value = core::str::from_utf8(payload)
        .ok()
        .and_then(|s| s.trim().parse::<f32>().ok());

    match value {
        Some(v) if is_valid_threshold(v) => Some(v),
        _ => {
            warn!(
                "Discarding {kind:?} threshold payload {:?}: not a positive number",
                String::from_utf8_lossy(payload)
            );
            None
        }
    }
}

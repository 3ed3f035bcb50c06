//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every status event to the ESP-IDF
//! logger (UART in production).  Paired with the MQTT publisher through
//! the tuple fan-out so the serial console shows what the broker sees.

use log::info;

use crate::app::events::{DistanceStatus, StatusEvent};
use crate::app::ports::EventSink;

#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &StatusEvent) {
        match event {
            StatusEvent::Mode(mode) => info!("MODE  | {}", mode.as_str()),
            StatusEvent::Pump(_) => info!("PUMP  | {}", event.payload()),
            StatusEvent::Distance(DistanceStatus::Reading(cm)) => {
                info!("LEVEL | {:.1} cm", cm);
            }
            StatusEvent::Distance(_) => info!("LEVEL | {}", event.payload()),
            StatusEvent::Threshold { kind, value_cm } => {
                info!("THRESH| {:?} = {:.1} cm", kind, value_cm);
            }
        }
    }
}

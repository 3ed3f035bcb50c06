//! Fuzz target: `PumpController::handle_message`
//!
//! The first input byte picks a topic (one of the four command topics or
//! an unrelated one); the rest is the payload.  The controller must never
//! panic and its thresholds must stay positive and finite.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use tankpump::app::events::StatusEvent;
use tankpump::app::ports::{ActuatorPort, EventSink};
use tankpump::app::service::PumpController;
use tankpump::config::SystemConfig;

struct NullOutputs;

impl ActuatorPort for NullOutputs {
    fn set_pump(&mut self, _on: bool) {}
    fn set_mode_indicator(&mut self, _automatic: bool) {}
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &StatusEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };

    let config = SystemConfig::default();
    let controller = PumpController::new(&config, NullOutputs);
    let topics = config.mqtt.topics.command_topics();
    let topic = topics
        .get(usize::from(selector) % 5)
        .copied()
        .unwrap_or("esp32/status/bomba");

    controller.handle_message(topic, payload, &mut NullSink);

    let state = controller.snapshot();
    assert!(state.threshold_on_cm.is_finite() && state.threshold_on_cm > 0.0);
    assert!(state.threshold_off_cm.is_finite() && state.threshold_off_cm > 0.0);
});

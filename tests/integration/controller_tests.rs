//! Integration tests for the command path and the hysteresis path of
//! `PumpController`, against the recording actuator.

use std::sync::Arc;

use crate::mock_hw::{ActuatorCall, LogSink, MockHardware};

use tankpump::app::commands::Command;
use tankpump::app::events::{DistanceStatus, StatusEvent};
use tankpump::app::ports::EventSink;
use tankpump::app::service::PumpController;
use tankpump::config::SystemConfig;
use tankpump::control::hysteresis::PumpTransition;
use tankpump::control::state::{Mode, ThresholdKind};
use tankpump::sensors::DistanceSample;

const MODE_TOPIC: &str = "esp32/comando/modo";
const PUMP_TOPIC: &str = "esp32/comando/rele";
const ON_TOPIC: &str = "esp32/comando/dist_ligar";
const OFF_TOPIC: &str = "esp32/comando/dist_desligar";

fn make_controller() -> (PumpController<MockHardware>, MockHardware, LogSink) {
    let hw = MockHardware::new();
    let controller = PumpController::new(&SystemConfig::default(), hw.clone());
    (controller, hw, LogSink::new())
}

fn manual_controller() -> (PumpController<MockHardware>, MockHardware, LogSink) {
    let (c, hw, mut sink) = make_controller();
    c.handle_message(MODE_TOPIC, b"MANUAL", &mut sink);
    hw.clear();
    sink.events.clear();
    (c, hw, sink)
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_releases_relay_and_lights_mode_led() {
    let (c, hw, _) = make_controller();
    assert_eq!(
        hw.calls(),
        vec![ActuatorCall::SetPump(false), ActuatorCall::SetModeIndicator(true)]
    );
    let s = c.snapshot();
    assert_eq!(s.mode, Mode::Automatic);
    assert!(!s.pump_on);
}

#[test]
fn manual_boot_from_config() {
    let mut config = SystemConfig::default();
    config.control.initial_mode = Mode::Manual;
    let hw = MockHardware::new();
    let c = PumpController::new(&config, hw.clone());
    assert_eq!(c.mode(), Mode::Manual);
    assert_eq!(hw.mode_led(), Some(false));
}

// ── Hysteresis scenarios ──────────────────────────────────────

#[test]
fn far_reading_starts_pump_and_publishes() {
    let (c, hw, mut sink) = make_controller();
    hw.clear();

    let t = c.evaluate(DistanceSample::Valid(65.0), &mut sink);

    assert_eq!(t, Some(PumpTransition::TurnOn));
    assert!(c.snapshot().pump_on);
    assert_eq!(hw.calls(), vec![ActuatorCall::SetPump(true)]);
    assert_eq!(sink.events, vec![StatusEvent::Pump(true)]);
}

#[test]
fn hold_then_stop() {
    let (c, hw, mut sink) = make_controller();
    c.evaluate(DistanceSample::Valid(65.0), &mut sink);
    hw.clear();
    sink.events.clear();

    assert_eq!(c.evaluate(DistanceSample::Valid(25.0), &mut sink), None);
    assert!(c.snapshot().pump_on);
    assert!(hw.calls().is_empty());
    assert!(sink.events.is_empty());

    assert_eq!(
        c.evaluate(DistanceSample::Valid(15.0), &mut sink),
        Some(PumpTransition::TurnOff)
    );
    assert!(!c.snapshot().pump_on);
    assert_eq!(hw.calls(), vec![ActuatorCall::SetPump(false)]);
    assert_eq!(sink.events, vec![StatusEvent::Pump(false)]);
}

#[test]
fn timeout_and_out_of_range_never_actuate() {
    let (c, hw, mut sink) = make_controller();
    hw.clear();
    assert_eq!(c.evaluate(DistanceSample::Timeout, &mut sink), None);
    assert_eq!(c.evaluate(DistanceSample::OutOfRange, &mut sink), None);
    assert!(hw.calls().is_empty());
    assert!(sink.events.is_empty());
}

#[test]
fn evaluate_is_inert_in_manual_mode() {
    let (c, hw, mut sink) = manual_controller();
    assert_eq!(c.evaluate(DistanceSample::Valid(300.0), &mut sink), None);
    assert!(!c.snapshot().pump_on);
    assert!(hw.calls().is_empty());
}

// ── Manual pump commands ──────────────────────────────────────

#[test]
fn manual_pump_command_switches_relay() {
    let (c, hw, mut sink) = manual_controller();

    assert_eq!(
        c.handle_message(PUMP_TOPIC, b"LIGAR", &mut sink),
        Some(Command::SetPump(true))
    );
    assert!(c.snapshot().pump_on);
    assert_eq!(hw.calls(), vec![ActuatorCall::SetPump(true)]);
    assert_eq!(sink.payloads(), vec!["LIGADA"]);

    c.handle_message(PUMP_TOPIC, b"DESLIGAR", &mut sink);
    assert!(!c.snapshot().pump_on);
    assert_eq!(sink.payloads(), vec!["LIGADA", "DESLIGADA"]);
}

#[test]
fn repeated_manual_command_still_actuates_and_publishes() {
    let (c, hw, mut sink) = manual_controller();
    c.handle_message(PUMP_TOPIC, b"LIGAR", &mut sink);
    c.handle_message(PUMP_TOPIC, b"LIGAR", &mut sink);
    assert_eq!(hw.pump_writes(), 2);
    assert_eq!(sink.events.len(), 2);
}

#[test]
fn pump_command_ignored_in_automatic_mode() {
    let (c, hw, mut sink) = make_controller();
    hw.clear();

    // Still decodes, but changes nothing.
    assert_eq!(
        c.handle_message(PUMP_TOPIC, b"LIGAR", &mut sink),
        Some(Command::SetPump(true))
    );
    assert!(!c.snapshot().pump_on);
    assert!(hw.calls().is_empty());
    assert!(sink.events.is_empty());
}

#[test]
fn unknown_pump_payload_is_dropped() {
    let (c, hw, mut sink) = manual_controller();
    assert_eq!(c.handle_message(PUMP_TOPIC, b"ON", &mut sink), None);
    assert!(hw.calls().is_empty());
    assert!(sink.events.is_empty());
}

// ── Mode commands ─────────────────────────────────────────────

#[test]
fn mode_command_drives_led_and_publishes() {
    let (c, hw, mut sink) = make_controller();
    hw.clear();

    c.handle_message(MODE_TOPIC, b"MANUAL", &mut sink);
    assert_eq!(c.mode(), Mode::Manual);
    assert_eq!(hw.calls(), vec![ActuatorCall::SetModeIndicator(false)]);
    assert_eq!(sink.payloads(), vec!["MANUAL"]);

    c.handle_message(MODE_TOPIC, b"AUTOMATICO", &mut sink);
    assert_eq!(c.mode(), Mode::Automatic);
    assert_eq!(hw.mode_led(), Some(true));
    assert_eq!(sink.payloads(), vec!["MANUAL", "AUTOMATICO"]);
}

#[test]
fn unrecognised_mode_payload_means_manual() {
    let (c, _, mut sink) = make_controller();
    c.handle_message(MODE_TOPIC, b"auto", &mut sink);
    assert_eq!(c.mode(), Mode::Manual);
}

#[test]
fn same_mode_is_republished() {
    let (c, _, mut sink) = make_controller();
    c.handle_message(MODE_TOPIC, b"AUTOMATICO", &mut sink);
    assert_eq!(sink.events, vec![StatusEvent::Mode(Mode::Automatic)]);
}

#[test]
fn mode_switch_never_touches_pump() {
    let (c, hw, mut sink) = manual_controller();
    c.handle_message(PUMP_TOPIC, b"LIGAR", &mut sink);
    hw.clear();

    c.handle_message(MODE_TOPIC, b"AUTOMATICO", &mut sink);
    assert!(c.snapshot().pump_on);
    assert_eq!(hw.pump_writes(), 0);

    // Between thresholds: the automatic controller keeps it running.
    assert_eq!(c.evaluate(DistanceSample::Valid(40.0), &mut sink), None);
    assert!(c.snapshot().pump_on);
}

// ── Thresholds ────────────────────────────────────────────────

#[test]
fn threshold_updates_apply_in_any_mode_and_publish() {
    let (c, _, mut sink) = make_controller();
    c.handle_message(ON_TOPIC, b"80", &mut sink);
    assert!((c.snapshot().threshold_on_cm - 80.0).abs() < f32::EPSILON);
    assert_eq!(
        sink.events,
        vec![StatusEvent::Threshold { kind: ThresholdKind::On, value_cm: 80.0 }]
    );

    c.handle_message(MODE_TOPIC, b"MANUAL", &mut sink);
    c.handle_message(OFF_TOPIC, b" 12.5 ", &mut sink);
    assert!((c.snapshot().threshold_off_cm - 12.5).abs() < f32::EPSILON);
    assert_eq!(sink.payloads().last().map(String::as_str), Some("12.5"));
}

#[test]
fn negative_threshold_leaves_value_unchanged() {
    let (c, _, mut sink) = make_controller();
    assert_eq!(c.handle_message(ON_TOPIC, b"-5", &mut sink), None);
    assert!((c.snapshot().threshold_on_cm - 60.0).abs() < f32::EPSILON);
    assert!(sink.events.is_empty());
}

#[test]
fn huge_threshold_is_published_in_full() {
    let (c, _, mut sink) = make_controller();
    c.handle_message(ON_TOPIC, b"1e35", &mut sink);

    let stored = c.snapshot().threshold_on_cm;
    let payloads = sink.payloads();
    assert_eq!(payloads.len(), 1);
    assert!(payloads[0].ends_with(".0"), "{payloads:?}");
    assert_eq!(payloads[0].parse::<f32>().ok(), Some(stored));
}

#[test]
fn hand_built_invalid_threshold_is_rejected() {
    let (c, _, mut sink) = make_controller();
    assert!(!c.apply(Command::SetOffThreshold(0.0), &mut sink));
    assert!(!c.apply(Command::SetOnThreshold(f32::NAN), &mut sink));
    let s = c.snapshot();
    assert!((s.threshold_on_cm - 60.0).abs() < f32::EPSILON);
    assert!((s.threshold_off_cm - 20.0).abs() < f32::EPSILON);
}

#[test]
fn new_on_threshold_changes_decisions() {
    let (c, _, mut sink) = make_controller();
    c.handle_message(ON_TOPIC, b"100", &mut sink);
    assert_eq!(c.evaluate(DistanceSample::Valid(80.0), &mut sink), None);
    assert_eq!(
        c.evaluate(DistanceSample::Valid(101.0), &mut sink),
        Some(PumpTransition::TurnOn)
    );
}

// ── Snapshot ──────────────────────────────────────────────────

#[test]
fn snapshot_reports_current_state() {
    let (c, _, mut sink) = manual_controller();
    c.handle_message(PUMP_TOPIC, b"LIGAR", &mut sink);
    sink.events.clear();

    c.publish_snapshot(&mut sink);
    assert_eq!(
        sink.events,
        vec![
            StatusEvent::Mode(Mode::Manual),
            StatusEvent::Pump(true),
            StatusEvent::Distance(DistanceStatus::Inactive),
        ]
    );
    assert_eq!(
        sink.payloads(),
        vec!["MANUAL", "LIGADA", "Sensor inativo (modo manual)"]
    );
}

#[test]
fn unknown_topic_is_ignored() {
    let (c, hw, mut sink) = make_controller();
    hw.clear();
    assert_eq!(c.handle_message("esp32/comando/other", b"LIGAR", &mut sink), None);
    assert!(hw.calls().is_empty());
}

// ── Concurrency ───────────────────────────────────────────────

/// Runs queued commands through the controller from inside its first
/// `emit`, the way the MQTT worker can while the sensing loop publishes.
struct InterleavingSink {
    controller: Arc<PumpController<MockHardware>>,
    pending: Vec<(&'static str, &'static [u8])>,
    events: Vec<StatusEvent>,
}

impl EventSink for InterleavingSink {
    fn emit(&mut self, event: &StatusEvent) {
        let controller = Arc::clone(&self.controller);
        for (topic, payload) in std::mem::take(&mut self.pending) {
            controller.handle_message(topic, payload, &mut *self);
        }
        self.events.push(*event);
    }
}

impl InterleavingSink {
    fn last_pump(&self) -> Option<bool> {
        self.events.iter().rev().find_map(|e| match e {
            StatusEvent::Pump(on) => Some(*on),
            _ => None,
        })
    }
}

#[test]
fn pump_status_stays_current_when_a_command_lands_mid_publish() {
    let hw = MockHardware::new();
    let c = Arc::new(PumpController::new(&SystemConfig::default(), hw.clone()));
    let mut sink = InterleavingSink {
        controller: Arc::clone(&c),
        pending: vec![(MODE_TOPIC, &b"MANUAL"[..]), (PUMP_TOPIC, &b"DESLIGAR"[..])],
        events: Vec::new(),
    };

    assert_eq!(
        c.evaluate(DistanceSample::Valid(65.0), &mut sink),
        Some(PumpTransition::TurnOn)
    );

    assert!(!c.snapshot().pump_on);
    assert!(!hw.pump_on());
    assert_eq!(sink.last_pump(), Some(false));
}

#[test]
fn mode_status_stays_current_when_a_command_lands_mid_publish() {
    let (c, _, _) = make_controller();
    let c = Arc::new(c);
    let mut sink = InterleavingSink {
        controller: Arc::clone(&c),
        pending: vec![(MODE_TOPIC, &b"AUTOMATICO"[..])],
        events: Vec::new(),
    };

    c.apply(Command::SetMode(Mode::Manual), &mut sink);

    assert_eq!(c.mode(), Mode::Automatic);
    let last_mode = sink.events.iter().rev().find_map(|e| match e {
        StatusEvent::Mode(m) => Some(*m),
        _ => None,
    });
    assert_eq!(last_mode, Some(Mode::Automatic));
}

#[test]
fn commands_and_sensing_from_two_threads_stay_consistent() {
    let hw = MockHardware::new();
    let c = Arc::new(PumpController::new(&SystemConfig::default(), hw.clone()));

    let commands = {
        let c = Arc::clone(&c);
        std::thread::spawn(move || {
            let mut sink = LogSink::new();
            for i in 0..200 {
                let mode: &[u8] = if i % 2 == 0 { b"MANUAL" } else { b"AUTOMATICO" };
                c.handle_message(MODE_TOPIC, mode, &mut sink);
                let pump: &[u8] = if i % 3 == 0 { b"LIGAR" } else { b"DESLIGAR" };
                c.handle_message(PUMP_TOPIC, pump, &mut sink);
            }
        })
    };

    let sensing = {
        let c = Arc::clone(&c);
        std::thread::spawn(move || {
            let mut sink = LogSink::new();
            for i in 0..200 {
                let d = if i % 2 == 0 { 90.0 } else { 5.0 };
                c.evaluate(DistanceSample::Valid(d), &mut sink);
            }
        })
    };

    commands.join().unwrap();
    sensing.join().unwrap();

    // The last relay write always matches the recorded state.
    assert_eq!(hw.pump_on(), c.snapshot().pump_on);
}

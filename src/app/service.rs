//! Pump controller: the hexagonal core.
//!
//! [`PumpController`] owns the shared [`ControlState`] together with the
//! actuator port inside one mutex.  Both execution contexts hold it via
//! `Arc`: the MQTT event thread applies operator commands, the sensing
//! loop feeds distance samples through the hysteresis rule.
//!
//! ```text
//!  MQTT thread ── handle_message ──┐
//!                                  ▼
//!                      ┌───────────────────────┐
//!                      │ Mutex<ControlCore>    │ ──▶ ActuatorPort
//!                      │  ControlState + relay │     (relay, LEDs)
//!                      └───────────────────────┘
//!                                  ▲
//!  SensingLoop ─── evaluate ───────┘        status ──▶ EventSink
//! ```
//!
//! The state and the outputs only change together, under the lock.  Status
//! events are emitted after the guard is dropped, so a slow broker never
//! holds up the other context.  After each emit the value is re-read and
//! re-sent if it moved, so the last status on a topic always matches the
//! state.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{info, warn};

use crate::config::SystemConfig;
use crate::control::hysteresis::{PumpTransition, decide};
use crate::control::state::{ControlState, Mode, ThresholdKind};
use crate::sensors::DistanceSample;

use super::commands::{Command, CommandDecoder};
use super::events::{DistanceStatus, StatusEvent};
use super::ports::{ActuatorPort, EventSink};

// ───────────────────────────────────────────────────────────────
// ControlCore (lives behind the mutex)
// ───────────────────────────────────────────────────────────────

struct ControlCore<A> {
    state: ControlState,
    actuator: A,
}

impl<A: ActuatorPort> ControlCore<A> {
    fn switch_pump(&mut self, on: bool) {
        self.actuator.set_pump(on);
        self.state.pump_on = on;
    }

    /// Apply `cmd` to state and outputs.  Returns the status to publish,
    /// or `None` when the command had no effect.
    fn apply(&mut self, cmd: Command) -> Option<StatusEvent> {
        match cmd {
            Command::SetMode(mode) => {
                self.state.mode = mode;
                self.actuator.set_mode_indicator(mode.is_automatic());
                Some(StatusEvent::Mode(mode))
            }
            Command::SetPump(on) => {
                if self.state.mode.is_automatic() {
                    return None;
                }
                self.switch_pump(on);
                Some(StatusEvent::Pump(on))
            }
            Command::SetOnThreshold(v) => self.set_threshold(ThresholdKind::On, v),
            Command::SetOffThreshold(v) => self.set_threshold(ThresholdKind::Off, v),
        }
    }

    fn set_threshold(&mut self, kind: ThresholdKind, value_cm: f32) -> Option<StatusEvent> {
        self.state
            .set_threshold(kind, value_cm)
            .then_some(StatusEvent::Threshold { kind, value_cm })
    }
}

// ───────────────────────────────────────────────────────────────
// PumpController
// ───────────────────────────────────────────────────────────────

pub struct PumpController<A> {
    core: Mutex<ControlCore<A>>,
    decoder: CommandDecoder,
}

impl<A: ActuatorPort> PumpController<A> {
    /// Build the controller in its boot state and drive the outputs to
    /// match it: relay and pump LED off, mode LED per the initial mode.
    pub fn new(config: &SystemConfig, mut actuator: A) -> Self {
        let state = ControlState::from_config(&config.control);
        actuator.set_pump(false);
        actuator.set_mode_indicator(state.mode.is_automatic());

        info!(
            "Controller ready: mode={} on>{:.1}cm off<{:.1}cm",
            state.mode.as_str(),
            state.threshold_on_cm,
            state.threshold_off_cm
        );

        Self {
            core: Mutex::new(ControlCore { state, actuator }),
            decoder: CommandDecoder::new(config.mqtt.topics.clone()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlCore<A>> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current control state.
    pub fn snapshot(&self) -> ControlState {
        self.lock().state
    }

    pub fn mode(&self) -> Mode {
        self.lock().state.mode
    }

    pub fn decoder(&self) -> &CommandDecoder {
        &self.decoder
    }

    // ── Command path (MQTT event thread) ──────────────────────

    /// Decode and apply one inbound message.  Returns the decoded command,
    /// whether or not it changed anything.
    pub fn handle_message(
        &self,
        topic: &str,
        payload: &[u8],
        sink: &mut impl EventSink,
    ) -> Option<Command> {
        let cmd = self.decoder.decode(topic, payload)?;
        self.apply(cmd, sink);
        Some(cmd)
    }

    /// Apply a command.  Returns `true` if it took effect (and a status
    /// was emitted).
    pub fn apply(&self, cmd: Command, sink: &mut impl EventSink) -> bool {
        let event = self.lock().apply(cmd);

        let Some(event) = event else {
            match cmd {
                Command::SetPump(_) => info!("Pump command ignored in automatic mode"),
                _ => warn!("Command {cmd:?} rejected"),
            }
            return false;
        };

        match event {
            StatusEvent::Mode(mode) => info!("Mode set to {}", mode.as_str()),
            StatusEvent::Pump(on) => info!("Pump {} (manual)", if on { "ON" } else { "OFF" }),
            StatusEvent::Threshold { kind, value_cm } => {
                warn!("{kind:?} threshold set to {value_cm:.1} cm");
            }
            StatusEvent::Distance(_) => {}
        }
        self.publish_settled(event, sink);
        true
    }

    // ── Sensing path (main task) ──────────────────────────────

    /// Run the hysteresis rule against `sample` and apply any transition.
    ///
    /// Mode is re-checked under the same lock that applies the result, so
    /// a mode command racing with a slow measurement can never be
    /// overridden by a stale automatic decision.
    pub fn evaluate(
        &self,
        sample: DistanceSample,
        sink: &mut impl EventSink,
    ) -> Option<PumpTransition> {
        let transition = {
            let mut core = self.lock();
            let transition = decide(&core.state, sample)?;
            core.switch_pump(transition.target());
            transition
        };

        info!(
            "Pump {} (automatic, {:?})",
            if transition.target() { "ON" } else { "OFF" },
            sample
        );
        self.publish_settled(StatusEvent::Pump(transition.target()), sink);
        Some(transition)
    }

    /// Emit `event`, then re-read the state it reports on and emit again
    /// until the last value sent matches the state.  Emission runs without
    /// the lock, so another context may change the same value while the
    /// sink is busy; whoever finishes last leaves the topic current.
    fn publish_settled(&self, mut event: StatusEvent, sink: &mut impl EventSink) {
        loop {
            sink.emit(&event);
            let latest = self.current(event);
            if latest == event {
                return;
            }
            event = latest;
        }
    }

    /// `event` with its value replaced by what the state holds now.
    fn current(&self, event: StatusEvent) -> StatusEvent {
        let state = self.snapshot();
        match event {
            StatusEvent::Mode(_) => StatusEvent::Mode(state.mode),
            StatusEvent::Pump(_) => StatusEvent::Pump(state.pump_on),
            StatusEvent::Threshold { kind, .. } => StatusEvent::Threshold {
                kind,
                value_cm: state.threshold(kind),
            },
            StatusEvent::Distance(_) => event,
        }
    }

    // ── Snapshot (startup / broker connect) ───────────────────

    /// Emit mode, pump and the distance placeholder for the current mode.
    pub fn publish_snapshot(&self, sink: &mut impl EventSink) {
        let state = self.snapshot();
        sink.emit(&StatusEvent::Mode(state.mode));
        sink.emit(&StatusEvent::Pump(state.pump_on));
        let distance = if state.mode.is_automatic() {
            DistanceStatus::Waiting
        } else {
            DistanceStatus::Inactive
        };
        sink.emit(&StatusEvent::Distance(distance));
    }
}

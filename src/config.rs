//! System configuration parameters
//!
//! All tunable parameters for the pump controller.  Defaults reproduce the
//! factory behaviour; a JSON override can be baked in at build time through
//! the `TANKPUMP_CONFIG` environment variable (see `main`).  Thresholds and
//! mode changed over MQTT at runtime are not written back here.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::control::state::Mode;
use crate::error::{Error, Result};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub control: ControlConfig,
    pub sensor: SensorConfig,
    pub mqtt: MqttConfig,
}

/// Boot-time control state and loop timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Mode the controller boots into.
    pub initial_mode: Mode,
    /// Distance (cm) above which the pump is switched on in automatic mode.
    pub threshold_on_cm: f32,
    /// Distance (cm) below which the pump is switched off in automatic mode.
    pub threshold_off_cm: f32,
    /// Sensing loop period (milliseconds)
    pub sensing_period_ms: u32,
}

/// HC-SR04 timing and conversion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Trigger held LOW before the pulse (µs).
    pub trigger_settle_us: u32,
    /// Trigger HIGH pulse width (µs).
    pub trigger_pulse_us: u32,
    /// Bound on each of the two echo-edge waits (µs).
    pub echo_timeout_us: u32,
    /// Delay between echo polls (µs); 0 spins without yielding.
    pub echo_poll_interval_us: u32,
    /// Round-trip factor: distance = duration × factor / 2.
    pub speed_of_sound_cm_per_us: f32,
    /// Exclusive lower bound of a valid reading (cm).
    pub min_distance_cm: f32,
    /// Exclusive upper bound of a valid reading (cm).
    pub max_distance_cm: f32,
}

/// Broker endpoint and topic layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_url: String,
    pub client_id: String,
    pub topics: TopicConfig,
}

/// Every MQTT topic the firmware subscribes or publishes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    // --- Commands (subscribed) ---
    pub mode_command: String,
    pub pump_command: String,
    pub on_threshold_command: String,
    pub off_threshold_command: String,

    // --- Status (published) ---
    pub mode_status: String,
    pub pump_status: String,
    pub distance_status: String,
    pub on_threshold_status: String,
    pub off_threshold_status: String,
}

const DEFAULT_BROKER_URL: &str = "mqtt://mqtt.eclipseprojects.io";

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Automatic,
            threshold_on_cm: 60.0,
            threshold_off_cm: 20.0,
            sensing_period_ms: 2000,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            trigger_settle_us: 2,
            trigger_pulse_us: 10,
            echo_timeout_us: 500_000,
            echo_poll_interval_us: 10,
            speed_of_sound_cm_per_us: 0.0343,
            min_distance_cm: 2.0,
            max_distance_cm: 400.0,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: option_env!("BROKER_URL")
                .unwrap_or(DEFAULT_BROKER_URL)
                .to_string(),
            client_id: "tankpump".to_string(),
            topics: TopicConfig::default(),
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            mode_command: "esp32/comando/modo".into(),
            pump_command: "esp32/comando/rele".into(),
            on_threshold_command: "esp32/comando/dist_ligar".into(),
            off_threshold_command: "esp32/comando/dist_desligar".into(),
            mode_status: "esp32/status/modo".into(),
            pump_status: "esp32/status/bomba".into(),
            distance_status: "esp32/status/distancia".into(),
            on_threshold_status: "esp32/status/dist_ligar".into(),
            off_threshold_status: "esp32/status/dist_desligar".into(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            control: ControlConfig::default(),
            sensor: SensorConfig::default(),
            mqtt: MqttConfig::default(),
        }
    }
}

impl TopicConfig {
    /// The four command topics, in subscription order.
    pub fn command_topics(&self) -> [&str; 4] {
        [
            &self.mode_command,
            &self.pump_command,
            &self.on_threshold_command,
            &self.off_threshold_command,
        ]
    }

    fn all(&self) -> [&str; 9] {
        let [a, b, c, d] = self.command_topics();
        [
            a,
            b,
            c,
            d,
            &self.mode_status,
            &self.pump_status,
            &self.distance_status,
            &self.on_threshold_status,
            &self.off_threshold_status,
        ]
    }
}

impl SystemConfig {
    /// Parse a (possibly partial) JSON document and validate the result.
    /// Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve an optional JSON override.  A rejected override is logged
    /// and the defaults are used instead.
    pub fn from_override(json: Option<&str>) -> Self {
        let Some(json) = json else {
            return Self::default();
        };
        match Self::from_json(json) {
            Ok(config) => {
                info!("Config: build-time override applied");
                config
            }
            Err(e) => {
                warn!("Config: override rejected ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// Configuration compiled into the image (`TANKPUMP_CONFIG`).
    pub fn from_build_env() -> Self {
        Self::from_override(option_env!("TANKPUMP_CONFIG"))
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<()> {
        let c = &self.control;
        if !(c.threshold_on_cm.is_finite() && c.threshold_on_cm > 0.0) {
            return Err(Error::Config("threshold_on_cm must be > 0"));
        }
        if !(c.threshold_off_cm.is_finite() && c.threshold_off_cm > 0.0) {
            return Err(Error::Config("threshold_off_cm must be > 0"));
        }
        if c.sensing_period_ms == 0 {
            return Err(Error::Config("sensing_period_ms must be > 0"));
        }

        let s = &self.sensor;
        if s.echo_timeout_us == 0 {
            return Err(Error::Config("echo_timeout_us must be > 0"));
        }
        if s.trigger_pulse_us == 0 {
            return Err(Error::Config("trigger_pulse_us must be > 0"));
        }
        if !(s.speed_of_sound_cm_per_us.is_finite() && s.speed_of_sound_cm_per_us > 0.0) {
            return Err(Error::Config("speed_of_sound_cm_per_us must be > 0"));
        }
        if !(s.min_distance_cm >= 0.0 && s.min_distance_cm < s.max_distance_cm) {
            return Err(Error::Config("distance bounds must satisfy 0 <= min < max"));
        }

        if self.mqtt.broker_url.is_empty() {
            return Err(Error::Config("broker_url is empty"));
        }
        if self.mqtt.topics.all().iter().any(|t| t.is_empty()) {
            return Err(Error::Config("MQTT topic is empty"));
        }
        Ok(())
    }
}

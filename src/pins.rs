//! GPIO pin assignments for the pump controller board (ESP32 DevKit).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

/// Relay coil driver for the pump contactor (active HIGH).
pub const PUMP_RELAY_GPIO: i32 = 12;
/// LED mirroring the relay state.
pub const PUMP_STATUS_LED_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// On-board LED: HIGH = automatic mode, LOW = manual mode.
pub const MODE_INDICATOR_GPIO: i32 = 2;
/// LED lit while the MQTT broker session is up.
pub const BROKER_LINK_LED_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// HC-SR04 ultrasonic ranging sensor
// ---------------------------------------------------------------------------

/// Trigger output.  Wired through `esp_idf_hal::gpio::PinDriver` in `main`
/// (the constant documents the board; the typed peripheral is `gpio26`).
pub const ULTRASONIC_TRIGGER_GPIO: i32 = 26;
/// Echo input (5 V tolerant via divider).  Typed peripheral is `gpio25`.
pub const ULTRASONIC_ECHO_GPIO: i32 = 25;

/// Every plain output configured by `hw_init`.
pub const OUTPUT_GPIOS: [i32; 4] = [
    MODE_INDICATOR_GPIO,
    PUMP_RELAY_GPIO,
    BROKER_LINK_LED_GPIO,
    PUMP_STATUS_LED_GPIO,
];

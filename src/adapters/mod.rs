//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `hardware`     | ActuatorPort       | Relay, pump LED, mode LED|
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `mqtt`         | EventSink          | ESP-IDF MQTT client      |
//! |                | (command intake)   | broker session events    |
//! | `time`         | Clock              | ESP32 esp_timer          |
//! | `wifi`         | -                  | ESP-IDF WiFi STA         |

pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;

//! TankPump Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   UltrasonicSensor   Esp32TimeAdapter         │
//! │  (ActuatorPort)    (RangingPort)      (Clock)                  │
//! │  MqttStatusPublisher + LogEventSink   WiFi station             │
//! │  (EventSink)                                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │    PumpController (ControlState + hysteresis)          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  SensingLoop (main task)      MqttSession (mqtt-cmd thread)    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::{Result, anyhow};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::info;

use tankpump::adapters::hardware::HardwareAdapter;
use tankpump::adapters::mqtt;
use tankpump::adapters::time::Esp32TimeAdapter;
use tankpump::adapters::wifi::{self, WifiCredentials};
use tankpump::app::service::PumpController;
use tankpump::config::SystemConfig;
use tankpump::control::sensing::SensingLoop;
use tankpump::drivers::hw_init;
use tankpump::error::Error;
use tankpump::sensors::ultrasonic::UltrasonicSensor;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  TankPump v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::from_build_env();

    // ── 3. Outputs + controller ───────────────────────────────
    hw_init::init_peripherals().map_err(Error::from)?;
    let controller = Arc::new(PumpController::new(&config, HardwareAdapter::default()));

    // ── 4. Ranging sensor ─────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let trigger = PinDriver::output(peripherals.pins.gpio26)?;
    let echo = PinDriver::input(peripherals.pins.gpio25)?;
    let sensor = UltrasonicSensor::new(
        trigger,
        echo,
        Ets,
        Esp32TimeAdapter::new(),
        config.sensor.clone(),
    );

    // ── 5. Network ────────────────────────────────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let creds = WifiCredentials::from_build_env().map_err(|e| anyhow!("WiFi: {e}"))?;
    let station = wifi::connect_station(peripherals.modem, sysloop, nvs, &creds).map_err(Error::from)?;
    wifi::spawn_supervisor(station)?;

    let sink = mqtt::start(&config.mqtt, Arc::clone(&controller)).map_err(Error::from)?;

    // ── 6. Sensing loop (never returns) ───────────────────────
    info!("System ready.");
    SensingLoop::new(
        sensor,
        config.control.initial_mode,
        config.control.sensing_period_ms,
    )
    .run(&controller, sink)
}

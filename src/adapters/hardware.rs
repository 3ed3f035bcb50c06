//! Hardware adapter: bridges the output drivers to [`ActuatorPort`].
//!
//! Owns the pump relay driver and the mode indicator.  The broker link
//! LED is not part of the control state and stays with the MQTT adapter.
//! On non-espidf targets the drivers write to the hw_init simulation table.

use crate::app::ports::ActuatorPort;
use crate::drivers::pump::PumpDriver;
use crate::drivers::status_led::IndicatorLed;
use crate::pins;

pub struct HardwareAdapter {
    pump: PumpDriver,
    mode_led: IndicatorLed,
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new(
            PumpDriver::new(pins::PUMP_RELAY_GPIO, pins::PUMP_STATUS_LED_GPIO),
            IndicatorLed::new(pins::MODE_INDICATOR_GPIO),
        )
    }
}

impl HardwareAdapter {
    pub fn new(pump: PumpDriver, mode_led: IndicatorLed) -> Self {
        Self { pump, mode_led }
    }

    pub fn pump_on(&self) -> bool {
        self.pump.is_on()
    }

    pub fn mode_led_lit(&self) -> bool {
        self.mode_led.is_lit()
    }
}

impl ActuatorPort for HardwareAdapter {
    fn set_pump(&mut self, on: bool) {
        self.pump.set(on);
    }

    fn set_mode_indicator(&mut self, automatic: bool) {
        self.mode_led.set(automatic);
    }
}

//! Pump relay driver.
//!
//! The relay coil and the pump-status LED are always written together, so
//! the LED can never disagree with the contactor.  Active HIGH.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real GPIO via hw_init helpers.
//! On host/test: writes into the hw_init simulation table.

use crate::drivers::hw_init;

pub struct PumpDriver {
    relay_gpio: i32,
    led_gpio: i32,
    on: bool,
}

impl PumpDriver {
    pub fn new(relay_gpio: i32, led_gpio: i32) -> Self {
        Self {
            relay_gpio,
            led_gpio,
            on: false,
        }
    }

    pub fn set(&mut self, on: bool) {
        hw_init::gpio_write(self.relay_gpio, on);
        hw_init::gpio_write(self.led_gpio, on);
        self.on = on;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

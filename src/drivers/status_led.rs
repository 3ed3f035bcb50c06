//! Single-colour indicator LED on a plain GPIO (mode LED, broker link LED).

use crate::drivers::hw_init;

pub struct IndicatorLed {
    gpio: i32,
    lit: bool,
}

impl IndicatorLed {
    pub fn new(gpio: i32) -> Self {
        Self { gpio, lit: false }
    }

    pub fn set(&mut self, lit: bool) {
        hw_init::gpio_write(self.gpio, lit);
        self.lit = lit;
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

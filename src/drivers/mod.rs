//! Output drivers, hardware initialisation, and task helpers.

pub mod hw_init;
pub mod pump;
pub mod status_led;
pub mod task_pin;

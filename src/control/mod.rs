//! Control logic: the shared state record, the hysteresis rule and the
//! periodic sensing loop that drives it.

pub mod hysteresis;
pub mod sensing;
pub mod state;

//! HC-SR04 ultrasonic ranger.
//!
//! ```text
//!   TRIG ‾‾\__(2µs)__/‾‾‾(10µs)‾‾‾\______________________
//!   ECHO ______________________/‾‾‾‾‾‾ pulse ‾‾‾‾‾‾\_____
//!                              ^ rise              ^ fall
//! ```
//!
//! The pulse width is timed with the [`Clock`] port.  Both edge waits are
//! bounded by `echo_timeout_us`; running out of time on either yields
//! [`DistanceSample::Timeout`].  Between polls the driver sleeps
//! `echo_poll_interval_us` (0 = tight spin).
//!
//! Generic over `embedded-hal` 1.0 pins and delay so the same code runs
//! on `esp-idf-hal` `PinDriver`s and on the simulated pins used by the
//! integration tests.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::{Clock, RangingPort};
use crate::config::SensorConfig;
use crate::error::SensorError;
use crate::sensors::{DistanceSample, classify};

pub struct UltrasonicSensor<T, E, D, C> {
    trigger: T,
    echo: E,
    delay: D,
    clock: C,
    cfg: SensorConfig,
}

impl<T, E, D, C> UltrasonicSensor<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: Clock,
{
    pub fn new(trigger: T, echo: E, delay: D, clock: C, cfg: SensorConfig) -> Self {
        Self {
            trigger,
            echo,
            delay,
            clock,
            cfg,
        }
    }

    /// One full trigger/echo cycle.  GPIO failures surface as errors;
    /// timeouts and range violations are ordinary samples.
    pub fn try_measure(&mut self) -> Result<DistanceSample, SensorError> {
        self.fire_trigger()?;

        let Some(rise_us) = self.wait_for_echo(true)? else {
            return Ok(DistanceSample::Timeout);
        };
        let Some(fall_us) = self.wait_for_echo(false)? else {
            return Ok(DistanceSample::Timeout);
        };

        Ok(classify(fall_us.saturating_sub(rise_us), &self.cfg))
    }

    fn fire_trigger(&mut self) -> Result<(), SensorError> {
        self.trigger
            .set_low()
            .map_err(|_| SensorError::TriggerWriteFailed)?;
        self.delay.delay_us(self.cfg.trigger_settle_us);
        self.trigger
            .set_high()
            .map_err(|_| SensorError::TriggerWriteFailed)?;
        self.delay.delay_us(self.cfg.trigger_pulse_us);
        self.trigger
            .set_low()
            .map_err(|_| SensorError::TriggerWriteFailed)
    }

    /// Poll the echo line until it reads `level_high`.  Returns the clock
    /// reading at the edge, or `None` once the timeout has elapsed.
    fn wait_for_echo(&mut self, level_high: bool) -> Result<Option<u64>, SensorError> {
        let start = self.clock.now_us();
        let timeout = u64::from(self.cfg.echo_timeout_us);

        loop {
            let high = self
                .echo
                .is_high()
                .map_err(|_| SensorError::EchoReadFailed)?;
            let now = self.clock.now_us();
            if high == level_high {
                return Ok(Some(now));
            }
            if now.saturating_sub(start) > timeout {
                return Ok(None);
            }
            if self.cfg.echo_poll_interval_us > 0 {
                self.delay.delay_us(self.cfg.echo_poll_interval_us);
            }
        }
    }
}

impl<T, E, D, C> RangingPort for UltrasonicSensor<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: Clock,
{
    fn measure(&mut self) -> DistanceSample {
        match self.try_measure() {
            Ok(sample) => sample,
            Err(e) => {
                warn!("ultrasonic: {e}, reporting no echo");
                DistanceSample::Timeout
            }
        }
    }
}

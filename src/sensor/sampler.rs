//! Ultrasonic time-of-flight sampler.
//!
//! One measurement cycle: drive the trigger low and let the sensor settle,
//! pulse it high for ~10µs, then watch the echo line.
//!
//! The echo pin goes high when the burst leaves and low when the reflection
//! comes back. Both edges are busy-polled, each under its own deadline counted
//! from the moment polling for that edge starts. Missing either edge is a
//! timeout, which is an ordinary reading ("nothing in range"), not an error.

use crate::config::EchoTiming;
use crate::errors::AppResult;
use crate::hw::{GpioLines, Level};
use crate::models::{Distance, Slot};
use std::hint;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const SPEED_OF_SOUND_CM_PER_S: f64 = 34_300.0;

/// Something that can range one slot.
pub trait RangeSensor: Send {
    fn measure(&mut self, slot: &Slot) -> AppResult<Distance>;
}

/// Round-trip echo width → one-way distance in centimetres.
pub fn distance_from_echo(width: Duration) -> f64 {
    width.as_secs_f64() * SPEED_OF_SOUND_CM_PER_S / 2.0
}

pub struct EchoSampler {
    lines: Arc<dyn GpioLines>,
    timing: EchoTiming,
}

impl EchoSampler {
    pub fn new(lines: Arc<dyn GpioLines>, timing: EchoTiming) -> Self {
        Self { lines, timing }
    }

    fn pulse_trigger(&self, pin: u8) -> AppResult<()> {
        self.lines.write(pin, Level::Low)?;
        thread::sleep(self.timing.settle);

        self.lines.write(pin, Level::High)?;
        spin_for(self.timing.trigger_pulse);
        self.lines.write(pin, Level::Low)
    }
}

impl RangeSensor for EchoSampler {
    fn measure(&mut self, slot: &Slot) -> AppResult<Distance> {
        self.pulse_trigger(slot.trigger_pin)?;

        let timeout = self.timing.echo_timeout;
        let Some(t_start) = wait_for_level(&*self.lines, slot.echo_pin, Level::High, timeout)?
        else {
            return Ok(Distance::Timeout);
        };
        let Some(t_end) = wait_for_level(&*self.lines, slot.echo_pin, Level::Low, timeout)? else {
            return Ok(Distance::Timeout);
        };

        Ok(Distance::Measured(distance_from_echo(t_end - t_start)))
    }
}

/// Busy-poll `pin` until it reads `level`; `None` once `timeout` has elapsed.
fn wait_for_level(
    lines: &dyn GpioLines,
    pin: u8,
    level: Level,
    timeout: Duration,
) -> AppResult<Option<Instant>> {
    let deadline = Instant::now() + timeout;
    loop {
        let now = Instant::now();
        if lines.read(pin)? == level {
            return Ok(Some(now));
        }
        if now >= deadline {
            return Ok(None);
        }
        hint::spin_loop();
    }
}

/// Sleep granularity is far coarser than 10µs, so short pulses spin.
fn spin_for(d: Duration) {
    let until = Instant::now() + d;
    while Instant::now() < until {
        hint::spin_loop();
    }
}

//! In-memory line backend for tests and `serve --simulate`.
//!
//! Each echo pin can be bound to a trigger pin. Driving the trigger high and
//! back low "fires" the sensor; the echo line then answers with a pulse whose
//! width matches the configured object distance.

use super::{GpioLines, Level};
use crate::errors::{AppError, AppResult};
use crate::sensor::sampler::SPEED_OF_SOUND_CM_PER_S;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Delay between the trigger falling edge and the echo rising edge.
const ECHO_LATENCY: Duration = Duration::from_micros(200);

/// Most recent writes kept for inspection; older ones are dropped.
pub const WRITE_LOG_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
enum EchoProfile {
    /// Nothing in range: the echo line never rises.
    Silent,
    /// Echo line held high, as with a disconnected or faulty receiver.
    StuckHigh,
    Object(f64),
}

#[derive(Default)]
struct SimInner {
    levels: HashMap<u8, Level>,
    outputs: HashSet<u8>,
    inputs: HashSet<u8>,
    trigger_to_echo: HashMap<u8, u8>,
    echoes: HashMap<u8, EchoProfile>,
    fired_at: HashMap<u8, Instant>,
    failing: HashSet<u8>,
    writes: VecDeque<(u8, Level)>,
}

#[derive(Default)]
pub struct SimulatedLines {
    inner: Mutex<SimInner>,
}

impl SimulatedLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an echo pin to its trigger. The sensor starts with nothing in range.
    pub fn attach_sensor(&self, trigger_pin: u8, echo_pin: u8) {
        let mut inner = self.inner.lock();
        inner.trigger_to_echo.insert(trigger_pin, echo_pin);
        inner.echoes.insert(echo_pin, EchoProfile::Silent);
    }

    /// Place an object `cm` away from the sensor, or clear it with `None`.
    pub fn set_object(&self, echo_pin: u8, cm: Option<f64>) {
        let profile = match cm {
            Some(cm) => EchoProfile::Object(cm.max(0.0)),
            None => EchoProfile::Silent,
        };
        self.inner.lock().echoes.insert(echo_pin, profile);
    }

    pub fn set_stuck_high(&self, echo_pin: u8) {
        self.inner
            .lock()
            .echoes
            .insert(echo_pin, EchoProfile::StuckHigh);
    }

    /// Make every write to `pin` fail.
    pub fn fail_writes(&self, pin: u8) {
        self.inner.lock().failing.insert(pin);
    }

    /// Last level driven on an output line.
    pub fn level(&self, pin: u8) -> Option<Level> {
        self.inner.lock().levels.get(&pin).copied()
    }

    /// Recent writes, oldest first.
    pub fn writes(&self) -> Vec<(u8, Level)> {
        self.inner.lock().writes.iter().copied().collect()
    }

    pub fn is_output(&self, pin: u8) -> bool {
        self.inner.lock().outputs.contains(&pin)
    }

    pub fn is_input(&self, pin: u8) -> bool {
        self.inner.lock().inputs.contains(&pin)
    }
}

impl GpioLines for SimulatedLines {
    fn setup_output(&self, pin: u8) -> AppResult<()> {
        let mut inner = self.inner.lock();
        inner.inputs.remove(&pin);
        inner.outputs.insert(pin);
        Ok(())
    }

    fn setup_input(&self, pin: u8) -> AppResult<()> {
        let mut inner = self.inner.lock();
        inner.outputs.remove(&pin);
        inner.inputs.insert(pin);
        Ok(())
    }

    fn write(&self, pin: u8, level: Level) -> AppResult<()> {
        let mut inner = self.inner.lock();
        if inner.failing.contains(&pin) {
            return Err(AppError::Hardware {
                pin,
                message: "simulated write failure".into(),
            });
        }

        let previous = inner.levels.insert(pin, level);
        if inner.writes.len() == WRITE_LOG_CAPACITY {
            inner.writes.pop_front();
        }
        inner.writes.push_back((pin, level));

        // falling edge on a trigger fires the bound sensor
        if previous == Some(Level::High)
            && level == Level::Low
            && let Some(&echo) = inner.trigger_to_echo.get(&pin)
        {
            inner.fired_at.insert(echo, Instant::now());
        }
        Ok(())
    }

    fn read(&self, pin: u8) -> AppResult<Level> {
        let inner = self.inner.lock();
        let profile = inner.echoes.get(&pin).copied();

        let level = match profile {
            None => inner.levels.get(&pin).copied().unwrap_or(Level::Low),
            Some(EchoProfile::Silent) => Level::Low,
            Some(EchoProfile::StuckHigh) => Level::High,
            Some(EchoProfile::Object(cm)) => match inner.fired_at.get(&pin) {
                None => Level::Low,
                Some(fired) => {
                    let width = Duration::from_secs_f64(2.0 * cm / SPEED_OF_SOUND_CM_PER_S);
                    let elapsed = fired.elapsed();
                    Level::from(elapsed >= ECHO_LATENCY && elapsed < ECHO_LATENCY + width)
                }
            },
        };
        Ok(level)
    }
}

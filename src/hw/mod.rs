//! Digital line access for trigger, echo and indicator pins.
//!
//! Everything below this trait (kernel GPIO drivers, level shifters, the
//! sensor boards) is treated as an external collaborator. The sensor loop only
//! needs to drive a line and sample a line.

pub mod sim;
pub mod sysfs;

use crate::config::{Backend, Config};
use crate::errors::AppResult;
use crate::models::Slot;
use std::sync::Arc;

pub use sim::SimulatedLines;
pub use sysfs::SysfsLines;

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl Level {
    pub fn is_high(&self) -> bool {
        matches!(self, Level::High)
    }
}

/// Line-level hardware interface.
///
/// Implementations must be cheap to `read`: the sampler calls it in a tight
/// busy-poll loop.
pub trait GpioLines: Send + Sync {
    fn setup_output(&self, pin: u8) -> AppResult<()>;
    fn setup_input(&self, pin: u8) -> AppResult<()>;
    fn write(&self, pin: u8, level: Level) -> AppResult<()>;
    fn read(&self, pin: u8) -> AppResult<Level>;

    /// Hand the line back to the system.
    fn release(&self, _pin: u8) -> AppResult<()> {
        Ok(())
    }
}

/// Configure every slot's lines: trigger and LEDs as outputs, echo as input.
/// Triggers start low and LEDs show "free" until the first sweep.
pub fn setup_slots(lines: &dyn GpioLines, slots: &[Slot]) -> AppResult<()> {
    for slot in slots {
        for pin in slot.output_pins() {
            lines.setup_output(pin)?;
        }
        lines.setup_input(slot.echo_pin)?;

        lines.write(slot.trigger_pin, Level::Low)?;
        lines.write(slot.free_led_pin, Level::High)?;
        lines.write(slot.occupied_led_pin, Level::Low)?;
    }
    Ok(())
}

/// Switch indicators off and release every line. Best effort: failures are logged.
pub fn release_slots(lines: &dyn GpioLines, slots: &[Slot]) {
    for slot in slots {
        for pin in [slot.free_led_pin, slot.occupied_led_pin, slot.trigger_pin] {
            if let Err(e) = lines.write(pin, Level::Low) {
                log::warn!("Failed to reset line {}: {}", pin, e);
            }
        }
        for pin in slot.pins() {
            if let Err(e) = lines.release(pin) {
                log::warn!("Failed to release line {}: {}", pin, e);
            }
        }
    }
}

/// Build the backend selected in the configuration.
pub fn create_lines(cfg: &Config, force_simulated: bool) -> AppResult<Arc<dyn GpioLines>> {
    let backend = if force_simulated {
        Backend::Simulated
    } else {
        cfg.backend
    };

    match backend {
        Backend::Sysfs => {
            log::info!("GPIO backend: sysfs ({})", sysfs::DEFAULT_ROOT);
            Ok(Arc::new(SysfsLines::new()))
        }
        Backend::Simulated => {
            log::info!("GPIO backend: simulated");
            let sim = SimulatedLines::new();
            for slot in &cfg.slots {
                sim.attach_sensor(slot.trigger_pin, slot.echo_pin);
                if let Some(&cm) = cfg.simulated_cm.get(&slot.id) {
                    log::info!("Simulating an object {} cm from slot {}", cm, slot.id);
                    sim.set_object(slot.echo_pin, Some(cm));
                }
            }
            Ok(Arc::new(sim))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EchoTiming;
    use crate::models::Distance;
    use crate::models::slot::default_slots;
    use crate::sensor::sampler::{EchoSampler, RangeSensor};
    use std::time::Duration;

    #[test]
    fn setup_shows_all_slots_free() {
        let sim = SimulatedLines::new();
        let slots = default_slots();
        setup_slots(&sim, &slots).unwrap();

        for slot in &slots {
            assert_eq!(sim.level(slot.free_led_pin), Some(Level::High));
            assert_eq!(sim.level(slot.occupied_led_pin), Some(Level::Low));
            assert_eq!(sim.level(slot.trigger_pin), Some(Level::Low));
            assert!(sim.is_output(slot.trigger_pin));
            assert!(sim.is_input(slot.echo_pin));
        }
    }

    #[test]
    fn simulated_backend_places_configured_objects() {
        let mut cfg = Config::default();
        cfg.simulated_cm.insert(2, 3.0);
        let lines = create_lines(&cfg, true).unwrap();
        setup_slots(lines.as_ref(), &cfg.slots).unwrap();

        let timing = EchoTiming {
            settle: Duration::ZERO,
            ..cfg.echo_timing()
        };
        let mut sampler = EchoSampler::new(Arc::clone(&lines), timing);
        match sampler.measure(&cfg.slots[1]).unwrap() {
            Distance::Measured(cm) => assert!(cm < 10.0, "measured {}", cm),
            Distance::Timeout => panic!("expected an echo from slot 2"),
        }
        assert_eq!(sampler.measure(&cfg.slots[0]).unwrap(), Distance::Timeout);
    }

    #[test]
    fn release_turns_indicators_off() {
        let sim = SimulatedLines::new();
        let slots = default_slots();
        setup_slots(&sim, &slots).unwrap();
        release_slots(&sim, &slots);

        assert_eq!(sim.level(slots[0].free_led_pin), Some(Level::Low));
        assert_eq!(sim.level(slots[0].occupied_led_pin), Some(Level::Low));
    }
}

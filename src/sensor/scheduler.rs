//! The sensor loop.
//!
//! ```text
//! SWEEP_START ─► for each slot: SAMPLE ─► EVALUATE ─► PUBLISH ─► DRIVE_INDICATOR
//!      ▲                                                               │
//!      └──────────────────────── SLEEP(sweep interval) ◄───────────────┘
//! ```
//!
//! The loop is the only writer of the slot table. Nothing inside a sweep is
//! fatal: a failed sample leaves the previous state in place, a failed
//! indicator write is logged and not retried.

use super::evaluator::{OccupancyEvaluator, VehicleLookup};
use super::sampler::RangeSensor;
use crate::core::state_table::SlotStateTable;
use crate::hw::{GpioLines, Level};
use crate::models::Slot;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Upper bound on how long a shutdown request waits for the sleep phase.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Counters for one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub published: usize,
    pub occupied: usize,
    pub timeouts: usize,
    pub sample_errors: usize,
    pub indicator_errors: usize,
}

pub struct SensorLoop<S: RangeSensor> {
    slots: Vec<Slot>,
    sensor: S,
    lines: Arc<dyn GpioLines>,
    evaluator: OccupancyEvaluator,
    table: Arc<SlotStateTable>,
    lookup: Arc<dyn VehicleLookup>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl<S: RangeSensor + 'static> SensorLoop<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        slots: Vec<Slot>,
        sensor: S,
        lines: Arc<dyn GpioLines>,
        evaluator: OccupancyEvaluator,
        table: Arc<SlotStateTable>,
        lookup: Arc<dyn VehicleLookup>,
        interval: Duration,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            slots,
            sensor,
            lines,
            evaluator,
            table,
            lookup,
            interval,
            running,
        }
    }

    /// One pass over every configured slot.
    pub fn sweep(&mut self) -> SweepReport {
        let mut report = SweepReport::default();

        for slot in &self.slots {
            let distance = match self.sensor.measure(slot) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("Slot {}: sample failed: {}", slot.id, e);
                    report.sample_errors += 1;
                    continue;
                }
            };
            if distance.is_timeout() {
                log::debug!("Slot {}: no echo", slot.id);
                report.timeouts += 1;
            }

            let state = self
                .evaluator
                .evaluate(slot.id, distance, &*self.lookup, Utc::now());
            let occupied = state.occupied;

            if let Err(e) = self.table.publish(slot.id, state) {
                log::error!("Slot {}: publish failed: {}", slot.id, e);
                continue;
            }
            report.published += 1;
            if occupied {
                report.occupied += 1;
            }

            report.indicator_errors += drive_indicators(&*self.lines, slot, occupied);
        }

        report
    }

    /// Sweep until the running flag is cleared.
    pub fn run(&mut self) {
        log::info!(
            "Sensor loop started: {} slots, threshold {} cm, every {:?}",
            self.slots.len(),
            self.evaluator.threshold_cm(),
            self.interval
        );

        while self.running.load(Ordering::Relaxed) {
            let started = Instant::now();
            let report = self.sweep();
            log::debug!("Sweep finished in {:?}: {:?}", started.elapsed(), report);

            self.sleep_interval();
        }

        log::info!("Sensor loop stopped");
    }

    pub fn spawn(mut self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("sensor-loop".into())
            .spawn(move || self.run())
    }

    fn sleep_interval(&self) {
        let until = Instant::now() + self.interval;
        while self.running.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= until {
                break;
            }
            thread::sleep((until - now).min(SLEEP_SLICE));
        }
    }
}

/// Green for free, red for occupied. Returns the number of failed writes.
fn drive_indicators(lines: &dyn GpioLines, slot: &Slot, occupied: bool) -> usize {
    let writes = [
        (slot.free_led_pin, Level::from(!occupied)),
        (slot.occupied_led_pin, Level::from(occupied)),
    ];

    let mut failed = 0;
    for (pin, level) in writes {
        if let Err(e) = lines.write(pin, level) {
            log::warn!("Slot {}: indicator write failed: {}", slot.id, e);
            failed += 1;
        }
    }
    failed
}

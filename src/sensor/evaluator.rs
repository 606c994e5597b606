use crate::errors::AppResult;
use crate::models::{Distance, SlotState};
use chrono::{DateTime, Utc};

/// Read-only view of the ledger used to label an occupied slot.
pub trait VehicleLookup: Send + Sync {
    fn active_vehicle_for(&self, slot_id: u32) -> AppResult<Option<String>>;
}

/// Fixed-threshold occupancy rule.
///
/// Each reading is judged on its own; there is no hysteresis between sweeps,
/// so a vehicle sitting right at the threshold can flap between sweeps.
#[derive(Debug, Clone, Copy)]
pub struct OccupancyEvaluator {
    threshold_cm: f64,
}

impl OccupancyEvaluator {
    pub fn new(threshold_cm: f64) -> Self {
        Self { threshold_cm }
    }

    pub fn threshold_cm(&self) -> f64 {
        self.threshold_cm
    }

    pub fn is_occupied(&self, distance: Distance) -> bool {
        match distance {
            Distance::Timeout => false,
            Distance::Measured(cm) => cm <= self.threshold_cm,
        }
    }

    /// Turn a reading into the state to publish for `slot_id`.
    ///
    /// A failed ledger lookup only loses the vehicle label for this sweep.
    pub fn evaluate(
        &self,
        slot_id: u32,
        distance: Distance,
        lookup: &dyn VehicleLookup,
        now: DateTime<Utc>,
    ) -> SlotState {
        let occupied = self.is_occupied(distance);

        let vehicle_id = if occupied {
            match lookup.active_vehicle_for(slot_id) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("Slot {}: vehicle lookup failed: {}", slot_id, e);
                    None
                }
            }
        } else {
            None
        };

        SlotState::new(occupied, distance, vehicle_id, now)
    }
}

use super::distance::{Distance, TIMEOUT_SENTINEL_CM};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest evaluated state of one slot, as published by the sensor loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotState {
    pub occupied: bool,
    pub distance_cm: f64,
    pub vehicle_id: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl SlotState {
    /// Startup state: free, no reading yet (sentinel distance).
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            occupied: false,
            distance_cm: TIMEOUT_SENTINEL_CM,
            vehicle_id: None,
            last_updated: now,
        }
    }

    /// `vehicle_id` is dropped unless the slot is occupied.
    pub fn new(
        occupied: bool,
        distance: Distance,
        vehicle_id: Option<String>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            occupied,
            distance_cm: distance.rounded_cm(),
            vehicle_id: if occupied { vehicle_id } else { None },
            last_updated,
        }
    }
}

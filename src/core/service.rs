//! Operations behind the command surface: status queries read the slot table,
//! check-in/check-out/history go through the record store.

use crate::core::state_table::{SlotStateTable, StatusSummary};
use crate::db::RecordStore;
use crate::errors::{AppError, AppResult};
use crate::models::{ParkingRecord, SlotState};
use std::sync::Arc;

/// Hard cap on a single history page.
pub const MAX_HISTORY_LIMIT: usize = 1000;

pub struct ParkingService {
    table: Arc<SlotStateTable>,
    store: Arc<RecordStore>,
    history_limit: usize,
}

impl ParkingService {
    pub fn new(table: Arc<SlotStateTable>, store: Arc<RecordStore>, history_limit: usize) -> Self {
        Self {
            table,
            store,
            history_limit,
        }
    }

    pub fn table(&self) -> &Arc<SlotStateTable> {
        &self.table
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn status(&self) -> StatusSummary {
        self.table.summary()
    }

    pub fn slot(&self, slot_id: u32) -> AppResult<Arc<SlotState>> {
        self.table
            .get(slot_id)
            .ok_or(AppError::SlotNotFound(slot_id))
    }

    pub fn check_in(&self, slot_id: u32, vehicle_id: &str) -> AppResult<ParkingRecord> {
        let vehicle_id = normalize_vehicle_id(vehicle_id)?;
        self.store.check_in(slot_id, &vehicle_id, &*self.table)
    }

    pub fn check_out(&self, slot_id: u32) -> AppResult<ParkingRecord> {
        if !self.table.contains(slot_id) {
            return Err(AppError::InvalidSlot(slot_id.to_string()));
        }
        self.store.check_out(slot_id)
    }

    /// `None` means the configured default page size.
    pub fn history(&self, limit: Option<usize>) -> AppResult<Vec<ParkingRecord>> {
        let limit = limit.unwrap_or(self.history_limit).min(MAX_HISTORY_LIMIT);
        self.store.recent_history(limit)
    }
}

/// Plates are stored trimmed and upper-case so `ab 123` and `AB 123` collide.
pub fn normalize_vehicle_id(raw: &str) -> AppResult<String> {
    let v = raw.trim();
    if v.is_empty() {
        return Err(AppError::MissingField("vehicle_id"));
    }
    Ok(v.to_uppercase())
}

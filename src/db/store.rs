//! The parking ledger.
//!
//! A single owned connection behind a mutex. Every mutation runs inside an
//! IMMEDIATE transaction while holding that mutex, so the "is the slot free /
//! is the vehicle already parked" checks and the write that follows are one
//! atomic step with respect to other callers in this process, and the
//! transaction's write lock covers other processes sharing the file. The
//! partial unique indexes in the schema back both invariants up.

use crate::core::state_table::SlotOccupancy;
use crate::db::initialize::init_db;
use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::record::now_db;
use crate::models::{ParkingRecord, RecordStatus};
use crate::sensor::evaluator::VehicleLookup;
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};

pub struct RecordStore {
    conn: Mutex<Connection>,
}

impl RecordStore {
    /// Open (creating if needed), migrate and verify the ledger at `path`.
    pub fn open(path: &str) -> AppResult<Self> {
        let pool = DbPool::new(path)?;
        init_db(&pool.conn)?;
        Ok(Self {
            conn: Mutex::new(pool.into_conn()),
        })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let pool = DbPool::in_memory()?;
        init_db(&pool.conn)?;
        Ok(Self {
            conn: Mutex::new(pool.into_conn()),
        })
    }

    /// Start an active record for `vehicle_id` on `slot_id`.
    ///
    /// `occupancy` is consulted inside the transaction: unknown slots are
    /// rejected, and so is a slot whose sensor currently sees a vehicle.
    pub fn check_in(
        &self,
        slot_id: u32,
        vehicle_id: &str,
        occupancy: &dyn SlotOccupancy,
    ) -> AppResult<ParkingRecord> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        match occupancy.occupancy(slot_id) {
            None => return Err(AppError::InvalidSlot(slot_id.to_string())),
            Some(true) => return Err(AppError::SlotOccupiedConflict(slot_id)),
            Some(false) => {}
        }

        if queries::find_active_by_slot(&tx, slot_id)?.is_some() {
            return Err(AppError::SlotOccupiedConflict(slot_id));
        }
        if let Some(existing) = queries::find_active_by_vehicle(&tx, vehicle_id)? {
            return Err(AppError::VehicleAlreadyParked(existing.slot_id));
        }

        let record = match queries::insert_active(&tx, slot_id, vehicle_id, &now_db()) {
            Ok(r) => r,
            Err(e) => return Err(constraint_conflict(&tx, e, slot_id, vehicle_id)),
        };

        ttlog(
            &tx,
            "checkin",
            &format!("slot {}", slot_id),
            &format!("Vehicle {} checked in (record {})", vehicle_id, record.record_id),
        )?;
        tx.commit()?;

        log::info!("Slot {}: {} checked in", slot_id, vehicle_id);
        Ok(record)
    }

    /// Close the active record on `slot_id`.
    pub fn check_out(&self, slot_id: u32) -> AppResult<ParkingRecord> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(active) = queries::find_active_by_slot(&tx, slot_id)? else {
            return Err(AppError::NoActiveRecord(slot_id));
        };

        // a clock step backwards must not put check-out before check-in
        let check_out_time = now_db().max(active.check_in_time);
        if !queries::complete_record(&tx, active.record_id, &check_out_time)? {
            return Err(AppError::NoActiveRecord(slot_id));
        }

        ttlog(
            &tx,
            "checkout",
            &format!("slot {}", slot_id),
            &format!(
                "Vehicle {} checked out (record {})",
                active.vehicle_id, active.record_id
            ),
        )?;
        tx.commit()?;

        log::info!("Slot {}: {} checked out", slot_id, active.vehicle_id);
        Ok(ParkingRecord {
            check_out_time: Some(check_out_time),
            status: RecordStatus::Completed,
            ..active
        })
    }

    pub fn active_vehicle_for(&self, slot_id: u32) -> AppResult<Option<String>> {
        let conn = self.conn.lock();
        Ok(queries::find_active_by_slot(&conn, slot_id)?.map(|r| r.vehicle_id))
    }

    /// Newest check-ins first, at most `limit` rows.
    pub fn recent_history(&self, limit: usize) -> AppResult<Vec<ParkingRecord>> {
        let conn = self.conn.lock();
        Ok(queries::load_recent(&conn, limit)?)
    }

    pub fn active_records(&self) -> AppResult<Vec<ParkingRecord>> {
        let conn = self.conn.lock();
        Ok(queries::load_active(&conn)?)
    }
}

impl VehicleLookup for RecordStore {
    fn active_vehicle_for(&self, slot_id: u32) -> AppResult<Option<String>> {
        RecordStore::active_vehicle_for(self, slot_id)
    }
}

/// Translate a unique-index hit on insert back into the ledger conflict it stands for.
fn constraint_conflict(
    tx: &Transaction<'_>,
    err: rusqlite::Error,
    slot_id: u32,
    vehicle_id: &str,
) -> AppError {
    let is_unique = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    );
    if !is_unique {
        return err.into();
    }

    if err.to_string().contains("vehicle_id")
        && let Ok(Some(other)) = queries::find_active_by_vehicle(tx, vehicle_id)
    {
        return AppError::VehicleAlreadyParked(other.slot_id);
    }
    AppError::SlotOccupiedConflict(slot_id)
}

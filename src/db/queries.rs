use crate::errors::AppError;
use crate::models::record::{from_db_time, to_db_time};
use crate::models::{ParkingRecord, RecordStatus};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

const RECORD_COLUMNS: &str =
    "id, slot_id, vehicle_id, check_in_time, check_out_time, status";

fn conversion_error(col: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(err))
}

pub fn map_row(row: &Row) -> Result<ParkingRecord> {
    let check_in_str: String = row.get("check_in_time")?;
    let check_in_time = from_db_time(&check_in_str).ok_or_else(|| {
        conversion_error(3, AppError::Migration(format!("bad check_in_time: {}", check_in_str)))
    })?;

    let check_out_str: Option<String> = row.get("check_out_time")?;
    let check_out_time = match check_out_str {
        Some(s) => Some(from_db_time(&s).ok_or_else(|| {
            conversion_error(4, AppError::Migration(format!("bad check_out_time: {}", s)))
        })?),
        None => None,
    };

    let status_str: String = row.get("status")?;
    let status = RecordStatus::from_db_str(&status_str).ok_or_else(|| {
        conversion_error(5, AppError::Migration(format!("bad status: {}", status_str)))
    })?;

    Ok(ParkingRecord {
        record_id: row.get("id")?,
        slot_id: row.get("slot_id")?,
        vehicle_id: row.get("vehicle_id")?,
        check_in_time,
        check_out_time,
        status,
    })
}

pub fn insert_active(
    conn: &Connection,
    slot_id: u32,
    vehicle_id: &str,
    check_in_time: &DateTime<Utc>,
) -> Result<ParkingRecord> {
    conn.execute(
        "INSERT INTO parking_records (slot_id, vehicle_id, check_in_time, status)
         VALUES (?1, ?2, ?3, 'active')",
        params![slot_id, vehicle_id, to_db_time(check_in_time)],
    )?;

    Ok(ParkingRecord {
        record_id: conn.last_insert_rowid(),
        slot_id,
        vehicle_id: vehicle_id.to_string(),
        check_in_time: *check_in_time,
        check_out_time: None,
        status: RecordStatus::Active,
    })
}

pub fn find_active_by_slot(conn: &Connection, slot_id: u32) -> Result<Option<ParkingRecord>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {RECORD_COLUMNS} FROM parking_records
         WHERE slot_id = ?1 AND status = 'active'"
    ))?;
    stmt.query_row([slot_id], map_row).optional()
}

pub fn find_active_by_vehicle(conn: &Connection, vehicle_id: &str) -> Result<Option<ParkingRecord>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {RECORD_COLUMNS} FROM parking_records
         WHERE vehicle_id = ?1 AND status = 'active'"
    ))?;
    stmt.query_row([vehicle_id], map_row).optional()
}

/// Mark an active record completed. Returns false if it was not active.
pub fn complete_record(
    conn: &Connection,
    record_id: i64,
    check_out_time: &DateTime<Utc>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE parking_records
         SET check_out_time = ?1, status = 'completed'
         WHERE id = ?2 AND status = 'active'",
        params![to_db_time(check_out_time), record_id],
    )?;
    Ok(changed == 1)
}

/// Newest check-ins first.
pub fn load_recent(conn: &Connection, limit: usize) -> Result<Vec<ParkingRecord>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {RECORD_COLUMNS} FROM parking_records
         ORDER BY check_in_time DESC, id DESC
         LIMIT ?1"
    ))?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map([limit], map_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Whole ledger, oldest first.
pub fn load_all(conn: &Connection) -> Result<Vec<ParkingRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM parking_records
         ORDER BY check_in_time ASC, id ASC"
    ))?;
    let rows = stmt.query_map([], map_row)?;
    rows.collect()
}

pub fn load_active(conn: &Connection) -> Result<Vec<ParkingRecord>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {RECORD_COLUMNS} FROM parking_records
         WHERE status = 'active'
         ORDER BY slot_id ASC"
    ))?;
    let rows = stmt.query_map([], map_row)?;
    rows.collect()
}

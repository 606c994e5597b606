//! Startup and on-demand verification of the ledger invariants.

use crate::errors::{AppError, AppResult};
use rusqlite::Connection;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub sqlite: String,
    pub problems: Vec<String>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.sqlite == "ok" && self.problems.is_empty()
    }
}

fn count(conn: &Connection, sql: &str) -> rusqlite::Result<i64> {
    conn.query_row(sql, [], |row| row.get(0))
}

/// Run `PRAGMA integrity_check` and scan for rows that break the ledger rules.
pub fn check(conn: &Connection) -> AppResult<IntegrityReport> {
    let sqlite: String = conn.query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;
    let mut problems = Vec::new();

    let dup_slots = count(
        conn,
        "SELECT COUNT(*) FROM (
             SELECT slot_id FROM parking_records WHERE status = 'active'
             GROUP BY slot_id HAVING COUNT(*) > 1)",
    )?;
    if dup_slots > 0 {
        problems.push(format!("{} slot(s) with more than one active record", dup_slots));
    }

    let dup_vehicles = count(
        conn,
        "SELECT COUNT(*) FROM (
             SELECT vehicle_id FROM parking_records WHERE status = 'active'
             GROUP BY vehicle_id HAVING COUNT(*) > 1)",
    )?;
    if dup_vehicles > 0 {
        problems.push(format!(
            "{} vehicle(s) with more than one active record",
            dup_vehicles
        ));
    }

    let inconsistent = count(
        conn,
        "SELECT COUNT(*) FROM parking_records
         WHERE (status = 'active' AND check_out_time IS NOT NULL)
            OR (status = 'completed' AND (check_out_time IS NULL
                                          OR check_out_time < check_in_time))",
    )?;
    if inconsistent > 0 {
        problems.push(format!(
            "{} record(s) with inconsistent status/check-out time",
            inconsistent
        ));
    }

    Ok(IntegrityReport { sqlite, problems })
}

pub fn ensure_consistent(conn: &Connection) -> AppResult<()> {
    let report = check(conn)?;
    if report.is_ok() {
        return Ok(());
    }

    let mut details = report.problems.clone();
    if report.sqlite != "ok" {
        details.insert(0, format!("sqlite: {}", report.sqlite));
    }
    Err(AppError::Migration(format!(
        "ledger integrity check failed: {}",
        details.join("; ")
    )))
}

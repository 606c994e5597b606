use crate::db::log::ttlog;
use crate::errors::{AppError, AppResult};
use crate::models::record::to_db_time;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;

const LEGACY_IMPORT: &str = "20251019_0001_import_car_registration_schema";

/// Audit table. Created first: migrations record themselves in it.
fn ensure_log_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )
}

/// Ledger table plus the indexes and triggers that enforce its invariants:
/// one active row per slot, one per vehicle, check-out set iff completed and
/// never before check-in, rows never deleted, completed rows frozen.
fn create_records_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS parking_records (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            slot_id        INTEGER NOT NULL CHECK (slot_id > 0),
            vehicle_id     TEXT NOT NULL CHECK (length(vehicle_id) > 0),
            check_in_time  TEXT NOT NULL,
            check_out_time TEXT,
            status         TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active','completed')),
            CHECK (
                (status = 'active' AND check_out_time IS NULL)
                OR (status = 'completed' AND check_out_time IS NOT NULL
                    AND check_out_time >= check_in_time)
            )
        );

        CREATE UNIQUE INDEX IF NOT EXISTS ux_records_active_slot
            ON parking_records(slot_id) WHERE status = 'active';
        CREATE UNIQUE INDEX IF NOT EXISTS ux_records_active_vehicle
            ON parking_records(vehicle_id) WHERE status = 'active';
        CREATE INDEX IF NOT EXISTS idx_records_check_in
            ON parking_records(check_in_time);

        CREATE TRIGGER IF NOT EXISTS trg_records_no_delete
        BEFORE DELETE ON parking_records
        BEGIN
            SELECT RAISE(ABORT, 'parking_records is append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS trg_records_completed_frozen
        BEFORE UPDATE ON parking_records
        WHEN OLD.status = 'completed'
        BEGIN
            SELECT RAISE(ABORT, 'completed parking records cannot change');
        END;
        "#,
    )
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info('{}')", table))?;
    let cols = stmt.query_map([], |row| row.get::<_, String>(1))?;
    cols.collect()
}

/// True when both the audit table and the current ledger layout exist.
pub fn schema_current(conn: &Connection) -> rusqlite::Result<bool> {
    let has_log = !table_columns(conn, "log")?.is_empty();
    let ledger = table_columns(conn, "parking_records")?;
    Ok(has_log && ledger.iter().any(|c| c == "vehicle_id"))
}

fn migration_applied(conn: &Connection, version: &str) -> rusqlite::Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

/// Prototype timestamps were naive local ISO strings (`2025-09-01T09:00:00.123456`).
fn parse_legacy_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .map(|t| t.with_timezone(&Utc))
}

struct LegacyRow {
    id: i64,
    slot_id: Option<i64>,
    vehicle: Option<String>,
    check_in: Option<String>,
    check_out: Option<String>,
    status: Option<String>,
}

struct ImportedRow {
    id: i64,
    slot_id: i64,
    vehicle: String,
    check_in: DateTime<Utc>,
    check_out: Option<DateTime<Utc>>,
}

/// Rows of the legacy table, normalized so the imported set satisfies every
/// ledger invariant. The prototype enforced none of them, so an older active
/// row that collides with a newer one on slot or vehicle is closed at the
/// newer row's check-in time.
fn normalize_legacy(rows: Vec<LegacyRow>) -> (Vec<ImportedRow>, usize, usize) {
    let mut out: Vec<ImportedRow> = Vec::new();
    let mut skipped = 0;
    let mut closed = 0;
    let mut active_by_slot: HashMap<i64, usize> = HashMap::new();
    let mut active_by_vehicle: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let (Some(slot_id), Some(vehicle), Some(check_in)) = (
            row.slot_id.filter(|s| *s > 0),
            row.vehicle
                .map(|v| v.trim().to_uppercase())
                .filter(|v| !v.is_empty()),
            row.check_in.as_deref().and_then(parse_legacy_time),
        ) else {
            skipped += 1;
            continue;
        };

        let completed = row.status.as_deref() == Some("completed");
        let check_out = if completed {
            Some(
                row.check_out
                    .as_deref()
                    .and_then(parse_legacy_time)
                    .unwrap_or(check_in)
                    .max(check_in),
            )
        } else {
            None
        };

        if check_out.is_none() {
            let clashes = [
                active_by_slot.remove(&slot_id),
                active_by_vehicle.remove(&vehicle),
            ];
            for idx in clashes.into_iter().flatten() {
                let older = &mut out[idx];
                if older.check_out.is_none() {
                    older.check_out = Some(check_in.max(older.check_in));
                    active_by_slot.remove(&older.slot_id);
                    active_by_vehicle.remove(&older.vehicle);
                    closed += 1;
                }
            }
            active_by_slot.insert(slot_id, out.len());
            active_by_vehicle.insert(vehicle.clone(), out.len());
        }

        out.push(ImportedRow {
            id: row.id,
            slot_id,
            vehicle,
            check_in,
            check_out,
        });
    }

    (out, skipped, closed)
}

/// Convert a prototype `parking_records` table (`car_registration` column,
/// no constraints) into the constrained ledger.
fn migrate_legacy_records(conn: &Connection) -> AppResult<()> {
    let cols = table_columns(conn, "parking_records")?;
    if cols.is_empty() || !cols.iter().any(|c| c == "car_registration") {
        return Ok(());
    }
    if migration_applied(conn, LEGACY_IMPORT)? {
        return Err(AppError::Migration(
            "legacy parking_records table reappeared after import".into(),
        ));
    }

    log::warn!("Importing legacy parking_records table...");

    let rows: Vec<LegacyRow> = {
        let mut stmt = conn.prepare(
            "SELECT id, slot_id, car_registration, check_in_time, check_out_time, status
             FROM parking_records ORDER BY id ASC",
        )?;
        let mapped = stmt.query_map([], |row| {
            Ok(LegacyRow {
                id: row.get(0)?,
                slot_id: row.get(1)?,
                vehicle: row.get(2)?,
                check_in: row.get(3)?,
                check_out: row.get(4)?,
                status: row.get(5)?,
            })
        })?;
        mapped.collect::<rusqlite::Result<_>>()?
    };

    let (imported, skipped, closed) = normalize_legacy(rows);

    conn.execute_batch("BEGIN IMMEDIATE;")?;

    let result = (|| -> AppResult<()> {
        conn.execute_batch("ALTER TABLE parking_records RENAME TO parking_records_legacy;")?;
        create_records_table(conn)?;
        let mut insert = conn.prepare(
            "INSERT INTO parking_records
                (id, slot_id, vehicle_id, check_in_time, check_out_time, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for r in &imported {
            let status = if r.check_out.is_some() { "completed" } else { "active" };
            insert.execute(params![
                r.id,
                r.slot_id,
                r.vehicle,
                to_db_time(&r.check_in),
                r.check_out.as_ref().map(to_db_time),
                status,
            ])?;
        }
        drop(insert);
        conn.execute_batch("DROP TABLE parking_records_legacy;")?;
        ttlog(
            conn,
            "migration_applied",
            LEGACY_IMPORT,
            &format!(
                "Imported {} legacy records ({} skipped, {} stale active closed)",
                imported.len(),
                skipped,
                closed
            ),
        )?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT;")?;
            log::info!(
                "Legacy import done: {} records, {} skipped, {} closed",
                imported.len(),
                skipped,
                closed
            );
            Ok(())
        }
        Err(e) => {
            conn.execute_batch("ROLLBACK;").ok();
            Err(AppError::Migration(format!("legacy import failed: {}", e)))
        }
    }
}

/// Bring the schema up to date. Safe to run on every start.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<()> {
    ensure_log_table(conn)?;
    migrate_legacy_records(conn)?;
    create_records_table(conn)?;
    Ok(())
}

use predicates::str::contains;
use rusqlite::Connection;

mod common;
use common::{pkm, setup_test_db, write_config};

/// Table layout used by the first prototype: no constraints at all.
fn create_legacy_db(db_path: &str) {
    let conn = Connection::open(db_path).expect("open legacy db");
    conn.execute_batch(
        "CREATE TABLE parking_records (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             slot_id INTEGER NOT NULL,
             car_registration TEXT NOT NULL,
             check_in_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
             check_out_time TIMESTAMP,
             status TEXT DEFAULT 'active'
         );
         INSERT INTO parking_records (slot_id, car_registration, check_in_time, check_out_time, status)
         VALUES (1, 'old001', '2025-09-01T09:00:00.000000', '2025-09-01T11:30:00.000000', 'completed');
         INSERT INTO parking_records (slot_id, car_registration, check_in_time, status)
         VALUES (2, 'LEG002', '2025-09-02T08:00:00.000000', 'active');
         INSERT INTO parking_records (slot_id, car_registration, check_in_time, status)
         VALUES (2, 'LEG003', '2025-09-03T08:00:00.000000', 'active');",
    )
    .expect("seed legacy rows");
}

#[test]
fn test_legacy_schema_is_imported() {
    let db_path = setup_test_db("legacy_import");
    let cfg = write_config("legacy_import", &db_path, "");
    create_legacy_db(&db_path);

    pkm(&cfg)
        .args(["--db", &db_path, "db", "--migrate"])
        .assert()
        .success()
        .stdout(contains("Migration completed"));

    pkm(&cfg)
        .args(["--db", &db_path, "db", "--check"])
        .assert()
        .success()
        .stdout(contains("Integrity check passed"));

    let store = parkmon::db::RecordStore::open(&db_path).expect("open migrated store");
    assert_eq!(store.active_vehicle_for(2).unwrap().as_deref(), Some("LEG003"));

    let history = store.recent_history(10).unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().any(|r| r.vehicle_id == "OLD001"));
    assert_eq!(store.active_records().unwrap().len(), 1);

    pkm(&cfg)
        .args(["--db", &db_path, "log", "--print"])
        .assert()
        .success()
        .stdout(contains("migration_applied"));
}

#[test]
fn test_check_reports_broken_invariants() {
    let db_path = setup_test_db("broken_invariants");
    let cfg = write_config("broken_invariants", &db_path, "");
    {
        let conn = Connection::open(&db_path).unwrap();
        parkmon::db::migrate::run_pending_migrations(&conn).unwrap();
        // bypass the partial indexes to simulate a damaged file
        conn.execute_batch(
            "DROP INDEX ux_records_active_slot;
             INSERT INTO parking_records (slot_id, vehicle_id, check_in_time, status)
             VALUES (1, 'AAA111', '2025-10-01T08:00:00.000000Z', 'active');
             INSERT INTO parking_records (slot_id, vehicle_id, check_in_time, status)
             VALUES (1, 'BBB222', '2025-10-01T09:00:00.000000Z', 'active');",
        )
        .unwrap();
    }

    pkm(&cfg)
        .args(["--db", &db_path, "db", "--check"])
        .assert()
        .failure()
        .stdout(contains("more than one active record"));

    assert!(parkmon::db::RecordStore::open(&db_path).is_err());
}

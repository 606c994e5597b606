mod common;
use common::{init_db, pkm, setup_test_db, temp_out, write_config};
use parkmon::core::SlotStateTable;
use parkmon::db::RecordStore;
use std::fs;

/// Two completed stays and one car still parked. Returns the config path.
fn seed(name: &str, db_path: &str) -> String {
    let cfg = write_config(name, db_path, "");
    init_db(&cfg, db_path);
    let store = RecordStore::open(db_path).expect("open store");
    let table = SlotStateTable::new(1..=5, chrono::Utc::now());

    store.check_in(1, "EXP001", &table).expect("check in 1");
    store.check_out(1).expect("check out 1");
    store.check_in(2, "EXP002", &table).expect("check in 2");
    store.check_out(2).expect("check out 2");
    store.check_in(5, "EXP003", &table).expect("check in 5");
    cfg
}

#[test]
fn test_export_csv_all_records() {
    let db_path = setup_test_db("export_csv_all");
    let cfg = seed("export_csv_all", &db_path);
    let out = temp_out("export_csv_all", "csv");

    pkm(&cfg)
        .args(["--db", &db_path, "export", "--format", "csv", "--output", &out])
        .assert()
        .success();

    let content = fs::read_to_string(&out).expect("read exported csv");
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("record_id,slot_id,vehicle_id,check_in_time,check_out_time,status,duration_minutes")
    );
    assert_eq!(lines.count(), 3);
    assert!(content.contains("EXP001"));
    assert!(content.contains(",active,"));
}

#[test]
fn test_export_json_all_records() {
    let db_path = setup_test_db("export_json_all");
    let cfg = seed("export_json_all", &db_path);
    let out = temp_out("export_json_all", "json");

    pkm(&cfg)
        .args(["--db", &db_path, "export", "--format", "json", "--output", &out])
        .assert()
        .success();

    let content = fs::read_to_string(&out).expect("read exported json");
    let rows: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    let rows = rows.as_array().expect("json array");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["vehicle_id"], "EXP001");
    assert_eq!(rows[2]["status"], "active");
    assert_eq!(rows[2]["check_out_time"], "");
}

#[test]
fn test_export_force_overwrites() {
    let db_path = setup_test_db("export_force");
    let cfg = seed("export_force", &db_path);
    let out = temp_out("export_force", "csv");
    fs::write(&out, "stale").expect("write stale file");

    pkm(&cfg)
        .args(["--db", &db_path, "export", "--output", &out, "--force"])
        .assert()
        .success();

    let content = fs::read_to_string(&out).expect("read exported csv");
    assert!(!content.contains("stale"));
    assert!(content.contains("EXP002"));
}

#[test]
fn test_export_rejects_relative_path() {
    let db_path = setup_test_db("export_relative");
    let cfg = seed("export_relative", &db_path);

    pkm(&cfg)
        .args(["--db", &db_path, "export", "--output", "relative.csv"])
        .assert()
        .failure();
}

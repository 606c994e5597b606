mod common;
use common::setup_test_db;
use parkmon::core::{ParkingService, SlotStateTable};
use parkmon::db::RecordStore;
use parkmon::errors::AppError;
use parkmon::models::RecordStatus;
use std::sync::{Arc, Barrier};
use std::thread;

fn service(db_path: &str) -> ParkingService {
    let table = Arc::new(SlotStateTable::new(1..=5, chrono::Utc::now()));
    let store = Arc::new(RecordStore::open(db_path).expect("open store"));
    ParkingService::new(table, store, 50)
}

#[test]
fn test_slot_three_scenario() {
    let db_path = setup_test_db("store_slot_three");
    let svc = service(&db_path);

    let rec = svc.check_in(3, "ABC123").expect("first check-in");
    assert_eq!(rec.slot_id, 3);
    assert_eq!(rec.vehicle_id, "ABC123");

    assert!(matches!(
        svc.check_in(3, "XYZ999"),
        Err(AppError::SlotOccupiedConflict(3))
    ));

    let done = svc.check_out(3).expect("check-out");
    assert_eq!(done.vehicle_id, "ABC123");
    assert_eq!(done.status, RecordStatus::Completed);

    assert!(matches!(svc.check_out(3), Err(AppError::NoActiveRecord(3))));
}

#[test]
fn test_concurrent_check_in_same_vehicle() {
    let db_path = setup_test_db("store_concurrent_vehicle");
    let svc = Arc::new(service(&db_path));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [1u32, 2u32]
        .into_iter()
        .map(|slot| {
            let svc = Arc::clone(&svc);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                svc.check_in(slot, "RACE01")
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);

    let winner_slot = winners[0].slot_id;
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    match loser {
        AppError::VehicleAlreadyParked(slot) => assert_eq!(*slot, winner_slot),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_concurrent_check_in_same_slot() {
    let db_path = setup_test_db("store_concurrent_slot");
    let svc = Arc::new(service(&db_path));
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let svc = Arc::clone(&svc);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                svc.check_in(4, &format!("SAME{}", i))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AppError::SlotOccupiedConflict(4)))
    );
}

#[test]
fn test_random_sequence_keeps_invariants() {
    let db_path = setup_test_db("store_sequence");
    let svc = service(&db_path);
    let vehicles = ["V1", "V2", "V3"];

    // deterministic pseudo-random walk over slots and vehicles
    let mut seed: u32 = 7;
    for _ in 0..120 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let slot = (seed >> 8) % 5 + 1;
        let vehicle = vehicles[((seed >> 16) % 3) as usize];
        if (seed >> 4) % 2 == 0 {
            let _ = svc.check_in(slot, vehicle);
        } else {
            let _ = svc.check_out(slot);
        }

        let active = svc.store().active_records().unwrap();
        let mut slots: Vec<u32> = active.iter().map(|r| r.slot_id).collect();
        let mut cars: Vec<&str> = active.iter().map(|r| r.vehicle_id.as_str()).collect();
        let n = active.len();
        slots.sort_unstable();
        slots.dedup();
        cars.sort_unstable();
        cars.dedup();
        assert_eq!(slots.len(), n);
        assert_eq!(cars.len(), n);
    }

    for rec in svc.history(Some(1000)).unwrap() {
        match rec.status {
            RecordStatus::Active => assert!(rec.check_out_time.is_none()),
            RecordStatus::Completed => {
                assert!(rec.check_out_time.unwrap() >= rec.check_in_time)
            }
        }
    }
}

#[test]
fn test_records_survive_reopen() {
    let db_path = setup_test_db("store_reopen");
    {
        let svc = service(&db_path);
        svc.check_in(1, "KEEP01").unwrap();
        svc.check_in(2, "DONE01").unwrap();
        svc.check_out(2).unwrap();
    }

    let store = RecordStore::open(&db_path).expect("reopen");
    assert_eq!(store.active_vehicle_for(1).unwrap().as_deref(), Some("KEEP01"));
    assert_eq!(store.active_vehicle_for(2).unwrap(), None);

    let history = store.recent_history(50).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].vehicle_id, "DONE01");
    assert_eq!(history[1].vehicle_id, "KEEP01");
}

#[test]
fn test_history_is_newest_first_and_truncated() {
    let db_path = setup_test_db("store_history");
    let svc = service(&db_path);

    for i in 0..6 {
        let slot = (i % 5) + 1;
        svc.check_in(slot, &format!("H{:02}", i)).unwrap();
        svc.check_out(slot).unwrap();
    }

    let history = svc.history(Some(4)).unwrap();
    let ids: Vec<&str> = history.iter().map(|r| r.vehicle_id.as_str()).collect();
    assert_eq!(ids, vec!["H05", "H04", "H03", "H02"]);

    assert_eq!(svc.history(None).unwrap().len(), 6);
}

#[test]
fn test_storage_rejects_deletes_and_second_active() {
    let db_path = setup_test_db("store_schema_guards");
    {
        let svc = service(&db_path);
        svc.check_in(1, "GUARD1").unwrap();
    }

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    assert!(conn.execute("DELETE FROM parking_records", []).is_err());
    assert!(
        conn.execute(
            "INSERT INTO parking_records (slot_id, vehicle_id, check_in_time, status)
             VALUES (1, 'OTHER1', '2025-10-19T08:00:00.000000Z', 'active')",
            [],
        )
        .is_err()
    );
}

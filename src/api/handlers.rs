//! Dispatch of decoded requests onto [`ParkingService`].

use crate::api::ApiResponse;
use crate::core::ParkingService;
use crate::errors::{AppError, AppResult};
use crate::models::ParkingRecord;
use serde_json::{Value, json};

/// Handle one request line as received from the transport.
pub fn handle_line(svc: &ParkingService, line: &str) -> ApiResponse {
    match serde_json::from_str::<Value>(line) {
        Ok(req) => handle_request(svc, &req),
        Err(e) => ApiResponse::from(&AppError::Json(e)),
    }
}

pub fn handle_request(svc: &ParkingService, req: &Value) -> ApiResponse {
    let result = match req.get("op").and_then(Value::as_str) {
        None => Err(AppError::MissingField("op")),
        Some("status") => Ok(status(svc)),
        Some("slot") => slot(svc, req),
        Some("checkin") => check_in(svc, req),
        Some("checkout") => check_out(svc, req),
        Some("history") => history(svc, req),
        Some(other) => Err(AppError::Protocol(format!("unknown op '{}'", other))),
    };

    match result {
        Ok(body) => ApiResponse::ok(body),
        Err(e) => {
            if matches!(e, AppError::StoreUnavailable(_)) {
                log::error!("Request failed: {}", e);
            } else {
                log::debug!("Request rejected: {}", e);
            }
            ApiResponse::from(&e)
        }
    }
}

fn status(svc: &ParkingService) -> Value {
    json!(svc.status())
}

fn slot(svc: &ParkingService, req: &Value) -> AppResult<Value> {
    let slot_id = slot_field(req)?;
    let state = svc.slot(slot_id)?;

    let mut body = json!(*state);
    body["slot_id"] = json!(slot_id);
    Ok(body)
}

fn check_in(svc: &ParkingService, req: &Value) -> AppResult<Value> {
    let slot_id = slot_field(req)?;
    let vehicle_id = vehicle_field(req)?;
    let rec = svc.check_in(slot_id, vehicle_id)?;

    Ok(json!({
        "message": "Vehicle checked in successfully",
        "slot_id": rec.slot_id,
        "vehicle_id": rec.vehicle_id,
        "record_id": rec.record_id,
        "check_in_time": rec.check_in_time,
    }))
}

fn check_out(svc: &ParkingService, req: &Value) -> AppResult<Value> {
    let slot_id = slot_field(req)?;
    let rec = svc.check_out(slot_id)?;
    let duration = rec.check_out_time.map(|t| rec.duration_minutes(t));

    Ok(json!({
        "message": "Vehicle checked out successfully",
        "slot_id": rec.slot_id,
        "vehicle_id": rec.vehicle_id,
        "record_id": rec.record_id,
        "check_in_time": rec.check_in_time,
        "check_out_time": rec.check_out_time,
        "duration_minutes": duration,
    }))
}

fn history(svc: &ParkingService, req: &Value) -> AppResult<Value> {
    let records: Vec<ParkingRecord> = svc.history(limit_field(req))?;
    Ok(json!({
        "count": records.len(),
        "records": records,
    }))
}

/// `slot_id` must be a positive integer (numeric strings are accepted).
///
/// Absent, null, zero, empty and `false` count as missing.
fn slot_field(req: &Value) -> AppResult<u32> {
    let raw = match req.get("slot_id") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => {
            return Err(AppError::MissingField("slot_id"));
        }
        Some(v) => v,
    };

    let parsed = match raw {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if s.trim().is_empty() => return Err(AppError::MissingField("slot_id")),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed {
        Some(0) if raw.is_number() => Err(AppError::MissingField("slot_id")),
        Some(n) if n > 0 => u32::try_from(n).map_err(|_| AppError::InvalidSlot(n.to_string())),
        _ => Err(AppError::InvalidSlot(raw_repr(raw))),
    }
}

/// `vehicle_id`, or the older `car_registration` spelling.
fn vehicle_field(req: &Value) -> AppResult<&str> {
    req.get("vehicle_id")
        .filter(|v| !v.is_null())
        .or_else(|| req.get("car_registration"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or(AppError::MissingField("vehicle_id"))
}

/// Invalid or absent limits fall back to the configured default.
fn limit_field(req: &Value) -> Option<usize> {
    match req.get("limit")? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn raw_repr(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{STATUS_BAD_REQUEST, STATUS_CONFLICT, STATUS_NOT_FOUND, STATUS_OK};
    use crate::core::SlotStateTable;
    use crate::db::RecordStore;
    use crate::models::{Distance, SlotState};
    use chrono::Utc;
    use std::sync::Arc;

    fn service() -> ParkingService {
        let table = Arc::new(SlotStateTable::new(1..=5, Utc::now()));
        let store = Arc::new(RecordStore::open_in_memory().unwrap());
        ParkingService::new(table, store, 50)
    }

    fn call(svc: &ParkingService, req: Value) -> ApiResponse {
        handle_request(svc, &req)
    }

    #[test]
    fn slot_three_scenario() {
        let svc = service();

        let resp = call(&svc, json!({"op": "checkin", "slot_id": 3, "vehicle_id": "ABC123"}));
        assert_eq!(resp.status, STATUS_OK);
        assert_eq!(resp.body["slot_id"], 3);
        assert_eq!(resp.body["vehicle_id"], "ABC123");

        let resp = call(&svc, json!({"op": "checkin", "slot_id": 3, "vehicle_id": "XYZ999"}));
        assert_eq!(resp.status, STATUS_CONFLICT);
        assert_eq!(resp.body["kind"], "SlotOccupiedConflict");

        let resp = call(&svc, json!({"op": "checkout", "slot_id": 3}));
        assert_eq!(resp.status, STATUS_OK);
        assert_eq!(resp.body["vehicle_id"], "ABC123");
        assert!(resp.body["check_out_time"].is_string());

        let resp = call(&svc, json!({"op": "checkout", "slot_id": 3}));
        assert_eq!(resp.status, STATUS_NOT_FOUND);
        assert_eq!(resp.body["kind"], "NoActiveRecord");
    }

    #[test]
    fn missing_and_malformed_fields() {
        let svc = service();

        let resp = call(&svc, json!({"op": "checkin", "vehicle_id": "ABC123"}));
        assert_eq!(resp.status, STATUS_BAD_REQUEST);
        assert_eq!(resp.body["kind"], "MissingField");

        let resp = call(&svc, json!({"op": "checkin", "slot_id": 2}));
        assert_eq!(resp.body["kind"], "MissingField");

        let resp = call(&svc, json!({"op": "checkin", "slot_id": "two", "vehicle_id": "A1"}));
        assert_eq!(resp.body["kind"], "InvalidSlot");

        let resp = call(&svc, json!({"op": "checkin", "slot_id": -1, "vehicle_id": "A1"}));
        assert_eq!(resp.body["kind"], "InvalidSlot");

        let resp = call(&svc, json!({"op": "checkin", "slot_id": 0, "vehicle_id": "A1"}));
        assert_eq!(resp.body["kind"], "MissingField");

        let resp = call(&svc, json!({"op": "checkout"}));
        assert_eq!(resp.body["kind"], "MissingField");

        let resp = call(&svc, json!({"slot_id": 1}));
        assert_eq!(resp.body["kind"], "MissingField");

        let resp = call(&svc, json!({"op": "reboot"}));
        assert_eq!(resp.body["kind"], "Protocol");
    }

    #[test]
    fn unknown_slots() {
        let svc = service();

        let resp = call(&svc, json!({"op": "checkin", "slot_id": 9, "vehicle_id": "A1"}));
        assert_eq!(resp.body["kind"], "InvalidSlot");

        let resp = call(&svc, json!({"op": "checkout", "slot_id": 9}));
        assert_eq!(resp.body["kind"], "InvalidSlot");

        let resp = call(&svc, json!({"op": "slot", "slot_id": 9}));
        assert_eq!(resp.status, STATUS_NOT_FOUND);
        assert_eq!(resp.body["kind"], "SlotNotFound");
    }

    #[test]
    fn legacy_field_name_and_string_slot() {
        let svc = service();
        let resp = call(
            &svc,
            json!({"op": "checkin", "slot_id": "4", "car_registration": "ab12cde"}),
        );
        assert_eq!(resp.status, STATUS_OK);
        assert_eq!(resp.body["vehicle_id"], "AB12CDE");
    }

    #[test]
    fn vehicle_parked_elsewhere_reports_its_slot() {
        let svc = service();
        call(&svc, json!({"op": "checkin", "slot_id": 1, "vehicle_id": "DUP1"}));
        let resp = call(&svc, json!({"op": "checkin", "slot_id": 2, "vehicle_id": "DUP1"}));
        assert_eq!(resp.status, STATUS_CONFLICT);
        assert_eq!(resp.body["kind"], "VehicleAlreadyParked");
        assert_eq!(resp.body["slot_id"], 1);
    }

    #[test]
    fn status_and_slot_reads_are_stable() {
        let svc = service();
        svc.table()
            .publish(2, SlotState::new(true, Distance::Measured(4.26), None, Utc::now()))
            .unwrap();

        let a = call(&svc, json!({"op": "status"}));
        let b = call(&svc, json!({"op": "status"}));
        assert_eq!(a, b);
        assert_eq!(a.body["total_slots"], 5);
        assert_eq!(a.body["occupied"], 1);
        assert_eq!(a.body["free"], 4);

        let s = call(&svc, json!({"op": "slot", "slot_id": 2}));
        assert_eq!(s.body["occupied"], true);
        assert_eq!(s.body["distance_cm"], 4.3);
        assert_eq!(s, call(&svc, json!({"op": "slot", "slot_id": 2})));
    }

    #[test]
    fn history_limit_handling() {
        let svc = service();
        for slot in 1..=3u32 {
            call(
                &svc,
                json!({"op": "checkin", "slot_id": slot, "vehicle_id": format!("H{}", slot)}),
            );
        }

        let resp = call(&svc, json!({"op": "history", "limit": 2}));
        assert_eq!(resp.body["count"], 2);

        let resp = call(&svc, json!({"op": "history", "limit": "bogus"}));
        assert_eq!(resp.body["count"], 3);

        let resp = call(&svc, json!({"op": "history"}));
        assert_eq!(resp.body["records"][0]["status"], "active");
    }

    #[test]
    fn garbage_line_is_bad_request() {
        let svc = service();
        let resp = handle_line(&svc, "{not json");
        assert_eq!(resp.status, STATUS_BAD_REQUEST);
        assert_eq!(resp.body["kind"], "Json");
    }
}

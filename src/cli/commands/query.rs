//! Client commands: each one sends a single request to the running daemon.

use crate::api::ApiResponse;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::net::send_request;
use crate::ui::messages::success;
use crate::utils::colors::{CYAN, GREEN, GREY, RED, RESET, YELLOW, colorize_optional};
use serde_json::{Value, json};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Some(request) = build_request(cmd) else {
        return Ok(());
    };

    let response = send_request(&cfg.listen, &request)?;
    if !response.is_ok() {
        return Err(AppError::Rejected {
            status: response.status,
            message: response.error_message(),
        });
    }

    match cmd {
        Commands::Status => print_status(&response.body),
        Commands::Slot { slot_id } => print_slot(*slot_id, &response.body),
        Commands::Checkin { .. } => success(format!(
            "Vehicle {} checked in on slot {}",
            str_field(&response.body, "vehicle_id"),
            response.body["slot_id"]
        )),
        Commands::Checkout { .. } => print_checkout(&response),
        Commands::History { .. } => print_history(&response.body),
        _ => {}
    }

    Ok(())
}

pub fn build_request(cmd: &Commands) -> Option<Value> {
    let req = match cmd {
        Commands::Status => json!({"op": "status"}),
        Commands::Slot { slot_id } => json!({"op": "slot", "slot_id": slot_id}),
        Commands::Checkin {
            slot_id,
            vehicle_id,
        } => json!({"op": "checkin", "slot_id": slot_id, "vehicle_id": vehicle_id}),
        Commands::Checkout { slot_id } => json!({"op": "checkout", "slot_id": slot_id}),
        Commands::History { limit } => match limit {
            Some(n) => json!({"op": "history", "limit": n}),
            None => json!({"op": "history"}),
        },
        _ => return None,
    };
    Some(req)
}

fn str_field<'a>(v: &'a Value, key: &str) -> &'a str {
    v.get(key).and_then(Value::as_str).unwrap_or("--")
}

fn occupancy_label(occupied: bool) -> String {
    if occupied {
        format!("{}OCCUPIED{}", RED, RESET)
    } else {
        format!("{}FREE    {}", GREEN, RESET)
    }
}

fn distance_label(state: &Value) -> String {
    match state.get("distance_cm").and_then(Value::as_f64) {
        Some(d) if d >= crate::models::distance::TIMEOUT_SENTINEL_CM => {
            format!("{}  no echo{}", GREY, RESET)
        }
        Some(d) => format!("{:>6.1} cm", d),
        None => format!("{}       --{}", GREY, RESET),
    }
}

fn print_status(body: &Value) {
    println!(
        "{}🅿️  Slots: {}  occupied: {}{}{}  free: {}{}{}",
        CYAN,
        body["total_slots"],
        RED,
        body["occupied"],
        CYAN,
        GREEN,
        body["free"],
        RESET
    );
    println!("{}Last update: {}{}\n", GREY, str_field(body, "last_updated"), RESET);

    if let Some(slots) = body.get("slots").and_then(Value::as_object) {
        for (id, state) in slots {
            print_slot_line(id, state);
        }
    }
}

fn print_slot(slot_id: u32, body: &Value) {
    print_slot_line(&slot_id.to_string(), body);
    println!("{}Last update: {}{}", GREY, str_field(body, "last_updated"), RESET);
}

fn print_slot_line(id: &str, state: &Value) {
    let occupied = state.get("occupied").and_then(Value::as_bool).unwrap_or(false);
    let vehicle = state
        .get("vehicle_id")
        .and_then(Value::as_str)
        .map(|v| format!("{}{}{}", YELLOW, v, RESET))
        .unwrap_or_default();

    println!(
        "  Slot {:>3}  {}  {}  {}",
        id,
        occupancy_label(occupied),
        distance_label(state),
        vehicle
    );
}

fn print_checkout(response: &ApiResponse) {
    let body = &response.body;
    let minutes = body
        .get("duration_minutes")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    success(format!(
        "Vehicle {} checked out from slot {} after {} min",
        str_field(body, "vehicle_id"),
        body["slot_id"],
        minutes
    ));
}

fn print_history(body: &Value) {
    let records = body
        .get("records")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if records.is_empty() {
        println!("📭 No parking records.");
        return;
    }

    println!(
        "{}{:>6}  {:>4}  {:<12}  {:<27}  {:<27}  {}{}",
        CYAN, "ID", "SLOT", "VEHICLE", "CHECK-IN", "CHECK-OUT", "STATUS", RESET
    );

    for rec in &records {
        let status = str_field(rec, "status");
        let colour = if status == "active" { GREEN } else { GREY };
        println!(
            "{:>6}  {:>4}  {:<12}  {:<27}  {}  {}{}{}",
            rec["record_id"].as_i64().unwrap_or(0),
            rec["slot_id"].as_u64().unwrap_or(0),
            str_field(rec, "vehicle_id"),
            str_field(rec, "check_in_time"),
            colorize_optional(&format!("{:<27}", str_field(rec, "check_out_time"))),
            colour,
            status,
            RESET
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_match_the_wire_ops() {
        let req = build_request(&Commands::Checkin {
            slot_id: 3,
            vehicle_id: "ABC123".into(),
        })
        .unwrap();
        assert_eq!(req["op"], "checkin");
        assert_eq!(req["slot_id"], 3);
        assert_eq!(req["vehicle_id"], "ABC123");

        let req = build_request(&Commands::History { limit: None }).unwrap();
        assert!(req.get("limit").is_none());

        assert!(build_request(&Commands::Init).is_none());
    }
}

// src/export/model.rs

use crate::models::ParkingRecord;
use crate::models::record::to_db_time;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Flat row written by the CSV and JSON exporters.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RecordExport {
    pub record_id: i64,
    pub slot_id: u32,
    pub vehicle_id: String,
    pub check_in_time: String,
    /// Empty while the record is still active.
    pub check_out_time: String,
    pub status: String,
    pub duration_minutes: i64,
}

impl RecordExport {
    pub fn from_record(rec: &ParkingRecord, now: DateTime<Utc>) -> Self {
        Self {
            record_id: rec.record_id,
            slot_id: rec.slot_id,
            vehicle_id: rec.vehicle_id.clone(),
            check_in_time: to_db_time(&rec.check_in_time),
            check_out_time: rec
                .check_out_time
                .as_ref()
                .map(to_db_time)
                .unwrap_or_default(),
            status: rec.status.to_db_str().to_string(),
            duration_minutes: rec.duration_minutes(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordStatus;
    use chrono::TimeZone;

    #[test]
    fn active_record_exports_empty_checkout() {
        let t0 = Utc.with_ymd_and_hms(2025, 10, 19, 8, 30, 0).unwrap();
        let rec = ParkingRecord {
            record_id: 7,
            slot_id: 3,
            vehicle_id: "ABC123".into(),
            check_in_time: t0,
            check_out_time: None,
            status: RecordStatus::Active,
        };

        let row = RecordExport::from_record(&rec, t0 + chrono::Duration::minutes(42));
        assert_eq!(row.check_out_time, "");
        assert_eq!(row.status, "active");
        assert_eq!(row.duration_minutes, 42);
        assert_eq!(row.check_in_time, "2025-10-19T08:30:00.000000Z");
    }
}

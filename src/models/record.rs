use super::record_status::RecordStatus;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParkingRecord {
    pub record_id: i64,                        // ⇔ parking_records.id
    pub slot_id: u32,                          // ⇔ parking_records.slot_id
    pub vehicle_id: String,                    // ⇔ parking_records.vehicle_id
    pub check_in_time: DateTime<Utc>,          // ⇔ TEXT, RFC 3339 UTC, µs precision
    pub check_out_time: Option<DateTime<Utc>>, // ⇔ NULL while active
    pub status: RecordStatus,                  // ⇔ 'active' | 'completed'
}

impl ParkingRecord {
    /// Minutes parked, up to check-out or up to `now` while still active.
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.check_out_time.unwrap_or(now);
        (end - self.check_in_time).num_minutes().max(0)
    }
}

/// Fixed-width timestamp format used in the database.
///
/// Always UTC with microseconds, so lexical order equals chronological order
/// for both `ORDER BY` and the check-out `CHECK` constraint.
pub fn to_db_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time at the precision the database keeps.
pub fn now_db() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn from_db_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn db_time_is_lexically_ordered() {
        let a = Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2025, 10, 1, 8, 0, 0).unwrap();
        assert!(to_db_time(&a) < to_db_time(&b));
        assert_eq!(from_db_time(&to_db_time(&a)), Some(a));
    }

    #[test]
    fn duration_uses_checkout_when_completed() {
        let t0 = Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap();
        let rec = ParkingRecord {
            record_id: 1,
            slot_id: 2,
            vehicle_id: "AB123CD".into(),
            check_in_time: t0,
            check_out_time: Some(t0 + chrono::Duration::minutes(95)),
            status: RecordStatus::Completed,
        };
        assert_eq!(rec.duration_minutes(t0 + chrono::Duration::days(3)), 95);
    }
}

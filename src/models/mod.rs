pub mod distance;
pub mod record;
pub mod record_status;
pub mod slot;
pub mod slot_state;

pub use distance::Distance;
pub use record::ParkingRecord;
pub use record_status::RecordStatus;
pub use slot::Slot;
pub use slot_state::SlotState;

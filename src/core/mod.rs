pub mod log;
pub mod service;
pub mod state_table;

pub use service::ParkingService;
pub use state_table::{SlotOccupancy, SlotStateTable, StatusSummary};

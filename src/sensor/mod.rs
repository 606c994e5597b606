//! Sensor side of the monitor: sample, evaluate, publish, drive indicators.

pub mod evaluator;
pub mod sampler;
pub mod scheduler;

pub use evaluator::{OccupancyEvaluator, VehicleLookup};
pub use sampler::{EchoSampler, RangeSensor};
pub use scheduler::{SensorLoop, SweepReport};

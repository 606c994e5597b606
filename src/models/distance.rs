use serde::Serialize;

/// Distance reported for a measurement whose echo never arrived.
///
/// Far above any threshold, so a timed-out slot always reads as free.
pub const TIMEOUT_SENTINEL_CM: f64 = 999.0;

/// Result of one time-of-flight measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Distance {
    Measured(f64),
    Timeout,
}

impl Distance {
    /// Centimetres, with `Timeout` mapped onto the sentinel.
    pub fn as_cm(&self) -> f64 {
        match self {
            Distance::Measured(cm) => *cm,
            Distance::Timeout => TIMEOUT_SENTINEL_CM,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Distance::Timeout)
    }

    /// Rounded to one decimal, the way distances are published.
    pub fn rounded_cm(&self) -> f64 {
        (self.as_cm() * 10.0).round() / 10.0
    }
}

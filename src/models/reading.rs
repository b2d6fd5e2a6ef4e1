use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// A single sample as it comes back from the time-series store. Either field may
// be missing in the stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub value: Option<f64>,
}

impl Reading {
    pub fn new(sensor_id: impl Into<String>, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp: Some(timestamp),
            value: Some(value),
        }
    }

    /// Returns the timestamp and value if both are present and the value is finite.
    pub fn sample(&self) -> Option<(DateTime<Utc>, f64)> {
        match (self.timestamp, self.value) {
            (Some(ts), Some(v)) if v.is_finite() => Some((ts, v)),
            _ => None,
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reading from the drilling depth/speed sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthMeasurement {
    /// Current depth (m)
    pub depth_m: f64,
    /// Drilling velocity (m/s), when the sensor reports it
    #[serde(default)]
    pub velocity_ms: Option<f64>,
    pub measured_at: DateTime<Utc>,
}

impl DepthMeasurement {
    pub fn new(depth_m: f64) -> Self {
        Self {
            depth_m,
            velocity_ms: None,
            measured_at: Utc::now(),
        }
    }

    pub fn with_velocity(mut self, velocity_ms: f64) -> Self {
        self.velocity_ms = Some(velocity_ms);
        self
    }

    pub fn at(mut self, measured_at: DateTime<Utc>) -> Self {
        self.measured_at = measured_at;
        self
    }
}

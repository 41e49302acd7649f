use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latitude/longitude outside the WGS84 range, or not a finite number.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("coordinates out of range: lat={latitude}, lon={longitude}")]
pub struct InvalidCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Returns true when `lat`/`lon` are finite and within WGS84 bounds.
pub fn coordinates_in_range(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

/// Canonical GNSS position, independent of the payload schema it came from.
///
/// Can only be built through [`Position::new`], so every instance satisfies
/// the coordinate range invariant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    latitude: f64,
    longitude: f64,
    /// Elevation in meters (0.0 when the source did not report one)
    elevation: f64,
    observed_at: DateTime<Utc>,
}

impl Position {
    pub fn new(
        latitude: f64,
        longitude: f64,
        elevation: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, InvalidCoordinates> {
        if !coordinates_in_range(latitude, longitude) {
            return Err(InvalidCoordinates { latitude, longitude });
        }
        Ok(Self {
            latitude,
            longitude,
            elevation: if elevation.is_finite() { elevation } else { 0.0 },
            observed_at,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// Minimal position echo used in stats (serializable both ways).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub observed_at: DateTime<Utc>,
}

impl From<&Position> for LastPosition {
    fn from(p: &Position) -> Self {
        Self {
            latitude: p.latitude,
            longitude: p.longitude,
            elevation: p.elevation,
            observed_at: p.observed_at,
        }
    }
}

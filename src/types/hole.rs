use super::position::coordinates_in_range;
use serde::{Deserialize, Serialize};

/// Surveyed location of a hole collar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoleCoordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
}

impl HoleCoordinates {
    /// Returns `None` when the pair is unusable for matching.
    pub fn checked(latitude: f64, longitude: f64, elevation: Option<f64>) -> Option<Self> {
        coordinates_in_range(latitude, longitude).then_some(Self {
            latitude,
            longitude,
            elevation: elevation.filter(|e| e.is_finite()),
        })
    }
}

/// A known drill hole of the active project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    /// Project-local identifier such as "LK1" or "HK_01" (unique per registry)
    pub local_id: String,
    /// Numeric id on the remote holes API, once resolved
    pub remote_id: Option<i64>,
    pub name: String,
    /// Holes without coordinates never take part in matching
    pub coordinates: Option<HoleCoordinates>,
    /// Last known depth (m)
    pub depth: f64,
    pub design_name: Option<String>,
}

impl Hole {
    pub fn new(local_id: impl Into<String>) -> Self {
        let local_id = local_id.into();
        Self {
            name: local_id.clone(),
            local_id,
            remote_id: None,
            coordinates: None,
            depth: 0.0,
            design_name: None,
        }
    }

    pub fn with_remote_id(mut self, remote_id: i64) -> Self {
        self.remote_id = Some(remote_id);
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64, elevation: Option<f64>) -> Self {
        self.coordinates = HoleCoordinates::checked(latitude, longitude, elevation);
        self
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = depth;
        self
    }

    /// The remote address for depth uploads, when the hole has one.
    pub fn upload_target(&self) -> Option<UploadTarget> {
        self.remote_id.map(|remote_id| UploadTarget {
            local_id: self.local_id.clone(),
            remote_id,
        })
    }
}

impl std::fmt::Display for Hole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.remote_id {
            Some(id) => write!(f, "{} (#{})", self.local_id, id),
            None => write!(f, "{}", self.local_id),
        }
    }
}

/// A hole with a resolved remote id.
///
/// Only this type is accepted by the telemetry buffer, so nothing can be
/// queued for a hole the remote API cannot address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadTarget {
    pub local_id: String,
    pub remote_id: i64,
}

impl std::fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (#{})", self.local_id, self.remote_id)
    }
}

//! Wire types for the remote holes API

use crate::types::Hole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// A hole as returned by the remote API.
///
/// Every field is optional on the wire; coordinates and depth may arrive as
/// numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteHole {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub hole_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gps_lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gps_lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gps_elevation: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub depth: Option<f64>,
    #[serde(default)]
    pub design_name: Option<String>,
}

impl RemoteHole {
    /// Convert into a registry hole.
    ///
    /// The local id falls back to the stringified remote id; `None` when the
    /// record carries neither.
    pub fn into_hole(self) -> Option<Hole> {
        let local_id = self
            .hole_id
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().to_string())
            .or_else(|| self.id.map(|id| id.to_string()));

        let Some(local_id) = local_id else {
            warn!(name = ?self.name, "Remote hole has no id, skipping");
            return None;
        };

        let mut hole = Hole::new(local_id).with_depth(self.depth.unwrap_or(0.0));
        if let Some(name) = self.name.filter(|n| !n.is_empty()) {
            hole.name = name;
        }
        if let Some(id) = self.id {
            hole = hole.with_remote_id(id);
        }
        if let (Some(lat), Some(lon)) = (self.gps_lat, self.gps_lon) {
            hole = hole.with_coordinates(lat, lon, self.gps_elevation);
            if hole.coordinates.is_none() {
                warn!(hole = %hole.local_id, lat, lon, "Remote hole has invalid coordinates, excluded from matching");
            }
        }
        hole.design_name = self.design_name;
        Some(hole)
    }
}

/// `GET /projects/{p}/holes`
#[derive(Debug, Deserialize)]
pub struct HolesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub holes: Vec<RemoteHole>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /projects/{p}/holes/{hole}`
#[derive(Debug, Deserialize)]
pub struct HoleResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub hole: Option<RemoteHole>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of mutating calls. Only an explicit `"success": true` counts.
#[derive(Debug, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}


/// `PUT /projects/{p}/holes/{hole}` body
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DepthUpdate {
    pub depth: f64,
}

/// `POST /projects/{p}/holes/{hole}/drilling-speed` body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillingSpeedSample {
    pub speed: f64,
    pub depth: f64,
    #[serde(serialize_with = "utc_seconds_z")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
}

/// `2025-12-03T10:30:00Z`: whole seconds, literal `Z`.
fn utc_seconds_z<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&ts.format("%Y-%m-%dT%H:%M:%SZ"))
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrText {
        Num(f64),
        Text(String),
    }

    Ok(match Option::<NumOrText>::deserialize(d)? {
        Some(NumOrText::Num(v)) => Some(v),
        Some(NumOrText::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    }
    .filter(|v| v.is_finite()))
}

//! Position normalizer
//!
//! Structured payloads are matched against an ordered list of field-name
//! schemes. The first scheme whose latitude *and* longitude keys are both
//! present decides the record; fields from different schemes are never
//! combined.

use super::nmea::{self, NmeaError};
use crate::types::{InvalidCoordinates, Position};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Normalization errors. Callers drop the message and keep ingesting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("no complete numeric coordinate pair under any known scheme")]
    MissingCoordinates,

    #[error(transparent)]
    OutOfRange(#[from] InvalidCoordinates),

    #[error("invalid NMEA sentence: {0}")]
    InvalidSentence(#[from] NmeaError),
}

/// One accepted set of field names for latitude, longitude and elevation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldScheme {
    pub latitude: &'static str,
    pub longitude: &'static str,
    pub elevation: &'static str,
}

/// Recognised schemes, in priority order.
pub const FIELD_SCHEMES: [FieldScheme; 3] = [
    FieldScheme {
        latitude: "lat",
        longitude: "lon",
        elevation: "elevation",
    },
    FieldScheme {
        latitude: "latitude",
        longitude: "longitude",
        elevation: "alt",
    },
    FieldScheme {
        latitude: "gps_lat",
        longitude: "gps_lon",
        elevation: "gps_elevation",
    },
];

/// Keys under which some receivers nest the coordinate object.
pub const ENVELOPE_KEYS: [&str; 3] = ["gps", "location", "gnss"];

/// A payload as delivered by the position transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Already-decoded JSON object
    Fields(Map<String, Value>),
    /// Undecoded text: NMEA sentence or JSON document
    Text(String),
}

impl From<Map<String, Value>> for RawPayload {
    fn from(map: Map<String, Value>) -> Self {
        RawPayload::Fields(map)
    }
}

impl From<&str> for RawPayload {
    fn from(text: &str) -> Self {
        RawPayload::Text(text.to_string())
    }
}

/// Parses raw telemetry payloads into canonical positions.
#[derive(Debug, Clone)]
pub struct PositionNormalizer {
    schemes: Vec<FieldScheme>,
}

impl Default for PositionNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionNormalizer {
    pub fn new() -> Self {
        Self {
            schemes: FIELD_SCHEMES.to_vec(),
        }
    }

    /// Normalize a payload, stamping it with the current time.
    pub fn normalize(&self, payload: &RawPayload) -> Result<Position, ParseError> {
        self.normalize_at(payload, Utc::now())
    }

    /// Normalize a payload with an explicit observation time.
    pub fn normalize_at(
        &self,
        payload: &RawPayload,
        observed_at: DateTime<Utc>,
    ) -> Result<Position, ParseError> {
        match payload {
            RawPayload::Fields(map) => self.normalize_fields_at(map, observed_at),
            RawPayload::Text(text) => self.normalize_text(text, observed_at),
        }
    }

    /// Normalize an already-decoded JSON object.
    pub fn normalize_fields(&self, map: &Map<String, Value>) -> Result<Position, ParseError> {
        self.normalize_fields_at(map, Utc::now())
    }

    fn normalize_fields_at(
        &self,
        map: &Map<String, Value>,
        observed_at: DateTime<Utc>,
    ) -> Result<Position, ParseError> {
        let (lat, lon, elevation) = match self.match_schemes(map) {
            Some(fields) => fields,
            None => {
                let nested = ENVELOPE_KEYS
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_object))
                    .ok_or(ParseError::MissingCoordinates)?;
                self.match_schemes(nested)
                    .ok_or(ParseError::MissingCoordinates)?
            }
        };

        let lat = as_number(lat).ok_or(ParseError::MissingCoordinates)?;
        let lon = as_number(lon).ok_or(ParseError::MissingCoordinates)?;
        let elevation = match elevation {
            Some(v) => as_number(v).ok_or(ParseError::MissingCoordinates)?,
            None => 0.0,
        };

        Ok(Position::new(lat, lon, elevation, observed_at)?)
    }

    fn normalize_text(&self, text: &str, observed_at: DateTime<Utc>) -> Result<Position, ParseError> {
        let text = text.trim();
        if text.starts_with('$') {
            let fix = nmea::parse_gga(text)?;
            return Ok(Position::new(
                fix.latitude,
                fix.longitude,
                fix.altitude,
                observed_at,
            )?);
        }

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => self.normalize_fields_at(&map, observed_at),
            _ => Err(ParseError::MissingCoordinates),
        }
    }

    /// First scheme with both coordinate keys present (non-null).
    fn match_schemes<'a>(
        &self,
        map: &'a Map<String, Value>,
    ) -> Option<(&'a Value, &'a Value, Option<&'a Value>)> {
        self.schemes.iter().find_map(|scheme| {
            let lat = present(map, scheme.latitude)?;
            let lon = present(map, scheme.longitude)?;
            Some((lat, lon, present(map, scheme.elevation)))
        })
    }
}

fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

/// JSON numbers, or strings holding a number.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> RawPayload {
        match value {
            Value::Object(map) => RawPayload::Fields(map),
            other => panic!("not an object: {other}"),
        }
    }

    fn normalize(value: Value) -> Result<Position, ParseError> {
        PositionNormalizer::new().normalize(&fields(value))
    }

    #[test]
    fn test_all_schemes_produce_same_position() {
        let now = Utc::now();
        let n = PositionNormalizer::new();
        let payloads = [
            json!({"lat": 20.995293, "lon": 107.149251, "elevation": 12.5}),
            json!({"latitude": 20.995293, "longitude": 107.149251, "alt": 12.5}),
            json!({"gps_lat": 20.995293, "gps_lon": 107.149251, "gps_elevation": 12.5}),
        ];
        let positions: Vec<Position> = payloads
            .into_iter()
            .map(|p| n.normalize_at(&fields(p), now).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(positions[0].elevation(), 12.5);
    }

    #[test]
    fn test_elevation_defaults_to_zero() {
        let p = normalize(json!({"latitude": 21.0, "longitude": 105.8})).unwrap();
        assert_eq!(p.elevation(), 0.0);
    }

    #[test]
    fn test_first_complete_scheme_wins() {
        let p = normalize(json!({
            "lat": 1.0, "lon": 2.0,
            "latitude": 3.0, "longitude": 4.0,
        }))
        .unwrap();
        assert_eq!((p.latitude(), p.longitude()), (1.0, 2.0));
    }

    #[test]
    fn test_elevation_only_from_matched_scheme() {
        // "alt" belongs to scheme 2; scheme 1 matched, so elevation stays 0.
        let p = normalize(json!({"lat": 1.0, "lon": 2.0, "alt": 99.0})).unwrap();
        assert_eq!(p.elevation(), 0.0);
    }

    #[test]
    fn test_incomplete_scheme_falls_through() {
        let p = normalize(json!({"lat": 1.0, "gps_lat": 5.0, "gps_lon": 6.0})).unwrap();
        assert_eq!((p.latitude(), p.longitude()), (5.0, 6.0));
    }

    #[test]
    fn test_cross_scheme_mixing_rejected() {
        assert_eq!(
            normalize(json!({"lat": 1.0, "longitude": 2.0})),
            Err(ParseError::MissingCoordinates)
        );
    }

    #[test]
    fn test_missing_coordinates() {
        for payload in [
            json!({}),
            json!({"elevation": 3.0}),
            json!({"lat": null, "lon": null}),
            json!({"foo": "bar", "gps": 12}),
        ] {
            assert_eq!(normalize(payload), Err(ParseError::MissingCoordinates));
        }
    }

    #[test]
    fn test_non_numeric_values_rejected() {
        assert_eq!(
            normalize(json!({"lat": "north", "lon": 2.0})),
            Err(ParseError::MissingCoordinates)
        );
        assert_eq!(
            normalize(json!({"lat": 1.0, "lon": 2.0, "elevation": [1]})),
            Err(ParseError::MissingCoordinates)
        );
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let p = normalize(json!({"lat": "21.5", "lon": " 105.25 "})).unwrap();
        assert_eq!((p.latitude(), p.longitude()), (21.5, 105.25));
    }

    #[test]
    fn test_out_of_range_discarded() {
        assert!(matches!(
            normalize(json!({"lat": 91.0, "lon": 2.0})),
            Err(ParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_nested_envelope() {
        let p = normalize(json!({"device": "rtk-1", "location": {"latitude": 10.0, "longitude": 20.0, "alt": 3.0}}))
            .unwrap();
        assert_eq!((p.latitude(), p.longitude(), p.elevation()), (10.0, 20.0, 3.0));
    }

    #[test]
    fn test_text_json_and_nmea() {
        let n = PositionNormalizer::new();
        let p = n
            .normalize(&RawPayload::from(r#"{"gps_lat": 21.0, "gps_lon": 105.0}"#))
            .unwrap();
        assert_eq!(p.latitude(), 21.0);

        let p = n
            .normalize(&RawPayload::from(
                "$GNGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*59\r\n",
            ))
            .unwrap();
        assert!((p.latitude() - 48.1173).abs() < 1e-9);
        assert_eq!(p.elevation(), 545.4);
    }

    #[test]
    fn test_garbage_text() {
        let n = PositionNormalizer::new();
        assert_eq!(
            n.normalize(&RawPayload::from("hello")),
            Err(ParseError::MissingCoordinates)
        );
        assert!(matches!(
            n.normalize(&RawPayload::from("$GPGGA,1")),
            Err(ParseError::InvalidSentence(_))
        ));
    }
}

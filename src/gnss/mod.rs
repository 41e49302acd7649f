//! GNSS payload normalization
//!
//! Turns whatever the receiver bridge delivers (JSON objects with one of
//! several field-name schemes, JSON text, or raw NMEA GGA sentences) into a
//! validated [`Position`](crate::types::Position).

pub mod nmea;
mod normalizer;

pub use nmea::{parse_gga, GgaFix, NmeaError};
pub use normalizer::*;

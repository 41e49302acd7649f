//! NMEA 0183 GGA sentence parser
//!
//! Accepts GGA from any talker (`GP`, `GN`, `GL`, `GA`, `BD`, ...):
//!
//! ```text
//! $GNGGA,090110,2104.431759,N,10546.62665,E,1,28,1.1,.00,M,-13.46,M,43,*66
//!        time   lat         NS lon        EW q sv hdop alt
//! ```

use thiserror::Error;

/// GGA parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NmeaError {
    #[error("not a GGA sentence")]
    NotGga,

    #[error("expected at least 10 fields, got {0}")]
    TooFewFields(usize),

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("malformed {0}")]
    BadCoordinate(&'static str),

    #[error("checksum mismatch: sentence says {expected}, computed {computed}")]
    ChecksumMismatch { expected: String, computed: String },
}

/// Position fields extracted from a GGA sentence (decimal degrees, meters).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GgaFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Antenna altitude above mean sea level; 0.0 when the field is unusable
    pub altitude: f64,
}

/// Minimum field count up to and including the altitude field.
const MIN_GGA_FIELDS: usize = 10;

/// Parse one GGA sentence.
pub fn parse_gga(sentence: &str) -> Result<GgaFix, NmeaError> {
    let sentence = sentence.trim();
    let body = sentence.strip_prefix('$').ok_or(NmeaError::NotGga)?;

    let body = match body.split_once('*') {
        Some((data, checksum)) => {
            verify_checksum(data, checksum)?;
            data
        }
        None => body,
    };

    let fields: Vec<&str> = body.split(',').collect();
    let id = fields[0];
    if id.len() != 5 || !id.ends_with("GGA") {
        return Err(NmeaError::NotGga);
    }
    if fields.len() < MIN_GGA_FIELDS {
        return Err(NmeaError::TooFewFields(fields.len()));
    }

    let mut latitude = degrees_minutes(fields[2], "latitude")?;
    match fields[3] {
        "N" => {}
        "S" => latitude = -latitude,
        "" => return Err(NmeaError::MissingField("latitude hemisphere")),
        _ => return Err(NmeaError::BadCoordinate("latitude hemisphere")),
    }

    let mut longitude = degrees_minutes(fields[4], "longitude")?;
    match fields[5] {
        "E" => {}
        "W" => longitude = -longitude,
        "" => return Err(NmeaError::MissingField("longitude hemisphere")),
        _ => return Err(NmeaError::BadCoordinate("longitude hemisphere")),
    }

    let altitude = fields[9].parse::<f64>().unwrap_or(0.0);

    Ok(GgaFix {
        latitude,
        longitude,
        altitude,
    })
}

/// Convert `DDMM.MMMM` / `DDDMM.MMMM` to decimal degrees.
fn degrees_minutes(raw: &str, what: &'static str) -> Result<f64, NmeaError> {
    if raw.is_empty() {
        return Err(NmeaError::MissingField(what));
    }
    if !raw.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(NmeaError::BadCoordinate(what));
    }
    // Minutes always take two digits before the decimal point.
    let dot = raw.find('.').ok_or(NmeaError::BadCoordinate(what))?;
    if dot < 3 {
        return Err(NmeaError::BadCoordinate(what));
    }
    let (deg, min) = raw.split_at(dot - 2);
    let deg: f64 = deg.parse().map_err(|_| NmeaError::BadCoordinate(what))?;
    let min: f64 = min.parse().map_err(|_| NmeaError::BadCoordinate(what))?;
    if !(0.0..60.0).contains(&min) {
        return Err(NmeaError::BadCoordinate(what));
    }
    Ok(deg + min / 60.0)
}

fn verify_checksum(data: &str, checksum: &str) -> Result<(), NmeaError> {
    let computed = data.bytes().fold(0u8, |acc, b| acc ^ b);
    let computed = format!("{computed:02X}");
    let expected = checksum.trim().to_ascii_uppercase();
    if expected == computed {
        Ok(())
    } else {
        Err(NmeaError::ChecksumMismatch { expected, computed })
    }
}

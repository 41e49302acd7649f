//! System-wide default constants.
//!
//! Centralises the numbers the correlation engine and uploader fall back to
//! when the project config does not override them. Grouped by subsystem.

// ============================================================================
// Remote API
// ============================================================================

/// Base URL used when no `[api] base_url` is configured.
pub const API_BASE_URL: &str = "http://localhost:3000/api";

/// HTTP client timeout for remote API requests (seconds).
pub const API_HTTP_TIMEOUT_SECS: u64 = 10;

/// Timeout for the reachability probe (seconds).
pub const API_PING_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// GNSS Matching
// ============================================================================

/// Matching radius around a hole (meters).
pub const GNSS_MAX_DISTANCE_M: f64 = 10.0;

/// Mean Earth radius used by the haversine formula (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Relative tolerance under which two candidate distances count as a tie.
///
/// Ties keep the hole that appears first in registry order.
pub const MATCH_TIE_EPSILON: f64 = 1e-6;

/// How long a hole registry snapshot stays fresh (seconds). 300 = 5 minutes.
pub const REGISTRY_TTL_SECS: u64 = 300;

// ============================================================================
// Transport (external collaborator, carried for wiring)
// ============================================================================

/// Default MQTT broker host.
pub const MQTT_BROKER_HOST: &str = "localhost";

/// Default MQTT broker port.
pub const MQTT_BROKER_PORT: u16 = 1883;

/// Default MQTT topic the GNSS receivers publish on.
pub const MQTT_TOPIC: &str = "device/+/upload";

// ============================================================================
// Telemetry Upload
// ============================================================================

/// Uploader cycle cadence (seconds).
pub const UPLOAD_INTERVAL_SECS: u64 = 2;

/// Floor applied to the upload period when a zero interval slips through
pub const MIN_UPLOAD_INTERVAL_MS: u64 = 100;

/// Sensor identifier attached to drilling-speed posts.
pub const UPLOAD_SENSOR_ID: &str = "GNSS_RIG";

// ============================================================================
// Replay
// ============================================================================

/// Default delay between replayed lines (milliseconds).
pub const REPLAY_DELAY_MS: u64 = 1_000;

//! holetrack: GNSS hole correlation and drilling depth telemetry
//!
//! Correlates a rig's GNSS fixes with the surveyed drill holes of a project
//! and keeps the remote hole tracking service up to date with drilling depth.
//!
//! ## Architecture
//!
//! - **PositionNormalizer**: heterogeneous payloads (JSON schemes, NMEA GGA) to canonical positions
//! - **HoleRegistry / RegistryStore**: read-only hole snapshots, swapped wholesale on refresh
//! - **NearestHoleMatcher**: haversine nearest-hole search within a radius
//! - **TelemetryBuffer**: single-slot coalescing buffer for the latest depth
//! - **PeriodicUploader**: fixed-cadence upload task with cooperative shutdown and final flush
//! - **SyncCoordinator**: owns the recording session and wires the above together

pub mod api;
pub mod config;
pub mod gnss;
pub mod holes;
pub mod pipeline;
pub mod session;
pub mod telemetry;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, ProjectConfig, UploadEndpoint};

// Re-export commonly used types
pub use types::{DepthMeasurement, Hole, HoleCoordinates, Position, UploadTarget};

// Re-export the correlation engine
pub use gnss::{ParseError, PositionNormalizer, RawPayload};
pub use holes::{HoleRegistry, MatchOutcome, NearestHoleMatcher, RegistryStore};

// Re-export telemetry and session components
pub use api::{ApiError, HolesApi, HttpHolesClient, SharedApi};
pub use session::{DrillingSession, PositionUpdate, SessionSummary, SyncCoordinator};
pub use telemetry::{PeriodicUploader, TelemetryBuffer, UploadStats, UploaderState};

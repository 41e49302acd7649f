//! Shared data structures for GNSS-to-hole correlation and depth telemetry
//!
//! - [`Position`]: validated canonical GNSS fix (transient, one per message)
//! - [`Hole`]: a known drill hole from the project registry
//! - [`UploadTarget`]: a hole that can receive remote depth updates
//! - [`DepthMeasurement`]: one reading from the depth/drilling-speed sensor

mod position;
mod hole;
mod measurement;

pub use position::*;
pub use hole::*;
pub use measurement::*;

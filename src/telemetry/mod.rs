//! Drilling telemetry upload
//!
//! The ingestion path writes the latest depth into a [`TelemetryBuffer`];
//! the [`PeriodicUploader`] drains it on its own task. The buffer is the only
//! state the two share.

mod buffer;
mod uploader;

pub use buffer::{PendingUpload, TelemetryBuffer};
pub use uploader::{LastSent, PeriodicUploader, UploadStats, UploaderState};

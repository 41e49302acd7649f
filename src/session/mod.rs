//! Recording sessions
//!
//! The [`SyncCoordinator`] owns the [`DrillingSession`] for its whole
//! lifetime; there is no process-wide session instance.

mod coordinator;
mod state;

pub use coordinator::{PositionUpdate, SyncCoordinator};
pub use state::{DrillingSession, IngestStats, SessionSummary};

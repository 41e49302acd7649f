//! Session state and statistics

use crate::telemetry::{UploadStats, UploaderState};
use crate::types::{Hole, LastPosition};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A recording session, owned by the coordinator from start to stop.
#[derive(Debug, Clone, Serialize)]
pub struct DrillingSession {
    /// Hole currently being drilled, if any has been selected or matched
    pub active_hole: Option<Hole>,
    /// Latest depth (m); reset to the hole's last known depth on a switch
    pub current_depth: f64,
    pub last_sent_depth: Option<f64>,
    pub last_sent_at: Option<DateTime<Utc>>,
    /// Uploader lifecycle as seen by this session
    pub state: UploaderState,
    pub started_at: DateTime<Utc>,
}

impl DrillingSession {
    pub fn new(active_hole: Option<Hole>) -> Self {
        Self {
            current_depth: active_hole.as_ref().map_or(0.0, |h| h.depth),
            active_hole,
            last_sent_depth: None,
            last_sent_at: None,
            state: UploaderState::Idle,
            started_at: Utc::now(),
        }
    }

    pub fn active_hole_id(&self) -> Option<&str> {
        self.active_hole.as_ref().map(|h| h.local_id.as_str())
    }

    /// Make `hole` the active hole and reset depth tracking to its last
    /// known depth.
    pub(crate) fn switch_to(&mut self, hole: Hole) {
        self.current_depth = hole.depth;
        self.active_hole = Some(hole);
    }
}

/// Ingestion counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestStats {
    pub messages_received: u64,
    pub positions_accepted: u64,
    pub positions_rejected: u64,
    /// Positions that matched a hole within the radius
    pub matches: u64,
    pub hole_switches: u64,
    pub measurements: u64,
    pub last_position: Option<LastPosition>,
}

/// End-of-session report: ingestion and upload side together.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub active_hole: Option<String>,
    pub current_depth: Option<f64>,
    pub duration_secs: Option<i64>,
    pub ingest: IngestStats,
    pub upload: UploadStats,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hole={} depth={} messages={} accepted={} rejected={} matches={} switches={} measurements={} sent={} failed={}",
            self.active_hole.as_deref().unwrap_or("-"),
            self.current_depth
                .map_or_else(|| "-".to_string(), |d| format!("{d:.2}m")),
            self.ingest.messages_received,
            self.ingest.positions_accepted,
            self.ingest.positions_rejected,
            self.ingest.matches,
            self.ingest.hole_switches,
            self.ingest.measurements,
            self.upload.total_sent,
            self.upload.total_failed,
        )
    }
}

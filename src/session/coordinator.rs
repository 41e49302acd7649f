//! Sync coordinator
//!
//! Owns one recording session at a time and wires the pieces together:
//!
//! ```text
//! payload -> PositionNormalizer -> NearestHoleMatcher -> active hole
//! depth measurement -> TelemetryBuffer -> PeriodicUploader -> holes API
//! ```
//!
//! Nothing on the ingestion path waits on the network. Registry refreshes run
//! on a background task and uploads on the uploader's own task.

use super::state::{DrillingSession, IngestStats, SessionSummary};
use crate::api::{ApiError, SharedApi};
use crate::config::ProjectConfig;
use crate::gnss::{PositionNormalizer, RawPayload};
use crate::holes::{format_distance, HoleRegistry, MatchOutcome, NearestHoleMatcher, RegistryStore};
use crate::telemetry::{PeriodicUploader, TelemetryBuffer, UploaderState};
use crate::types::{DepthMeasurement, Hole, LastPosition, Position};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What an accepted position did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionUpdate {
    /// No session is recording
    Inactive,
    /// No hole within the matching radius
    Unmatched,
    /// Still at the active hole
    Unchanged { hole: String },
    /// Moved to a different hole
    Switched {
        from: Option<String>,
        to: String,
        distance_m: f64,
    },
}

pub struct SyncCoordinator {
    config: Arc<ProjectConfig>,
    api: SharedApi,
    registry: Arc<RegistryStore>,
    normalizer: PositionNormalizer,
    matcher: NearestHoleMatcher,
    buffer: Arc<TelemetryBuffer>,
    uploader: PeriodicUploader,
    session: Option<DrillingSession>,
    stats: IngestStats,
}

impl SyncCoordinator {
    pub fn new(config: Arc<ProjectConfig>, api: SharedApi) -> Self {
        let buffer = Arc::new(TelemetryBuffer::new());
        let uploader = PeriodicUploader::new(
            Arc::clone(&api),
            Arc::clone(&buffer),
            Duration::from_secs(config.upload.interval_secs),
            config.upload.endpoint,
            config.upload.sensor_id.clone(),
        );

        Self {
            registry: Arc::new(RegistryStore::new(Duration::from_secs(
                config.gnss.registry_ttl_secs,
            ))),
            normalizer: PositionNormalizer::new(),
            matcher: NearestHoleMatcher::new(config.gnss.max_distance_m),
            config,
            api,
            buffer,
            uploader,
            session: None,
            stats: IngestStats::default(),
        }
    }

    fn project_id(&self) -> Option<i64> {
        self.config.project.api_project_id
    }

    /// Begin recording.
    ///
    /// Loads the project's holes, resolves `selected` (a local hole id) if
    /// given, and starts the uploader. Missing configuration only disables
    /// uploads; it never fails the call. Ingest and upload counters start
    /// from zero for every session.
    pub async fn start_session(&mut self, selected: Option<&str>) {
        if self.session.is_some() {
            warn!("Session already active, stopping it first");
            self.stop_session().await;
        }
        self.stats = IngestStats::default();
        self.uploader.reset_stats();

        let project_id = self.project_id();
        match project_id {
            Some(pid) => {
                if let Err(e) = self.registry.refresh(&self.api, pid).await {
                    warn!(project_id = pid, error = %e, "Could not load holes, matching against previous registry");
                }
            }
            None => warn!("No API project id configured, hole registry stays local"),
        }

        let active = match selected {
            Some(local_id) => self.resolve_hole(local_id).await,
            None => None,
        };

        let mut session = DrillingSession::new(active);
        self.uploader.start(project_id, session.active_hole.as_ref());
        session.state = self.uploader.state();

        info!(
            project = %self.config.project.name,
            hole = session.active_hole_id().unwrap_or("-"),
            holes = self.registry.snapshot().len(),
            uploader = %session.state,
            "Recording session started"
        );
        self.session = Some(session);
    }

    /// Registry first, then the remote API. Unknown holes are not an error.
    async fn resolve_hole(&self, local_id: &str) -> Option<Hole> {
        if let Some(hole) = self.registry.snapshot().get(local_id) {
            return Some(hole.clone());
        }

        let Some(pid) = self.project_id() else {
            debug!(hole = local_id, "Selected hole used without remote id");
            return Some(Hole::new(local_id));
        };

        match self.api.get_hole(pid, local_id).await {
            Ok(hole) => Some(hole),
            Err(e) if e.is_not_found() => {
                debug!(hole = local_id, "Selected hole not known remotely");
                None
            }
            Err(e) => {
                warn!(hole = local_id, error = %e, "Could not resolve selected hole");
                None
            }
        }
    }

    /// Normalize and process one inbound position payload.
    ///
    /// Malformed payloads are logged and dropped; `None` is returned.
    pub fn on_payload(&mut self, payload: &RawPayload) -> Option<PositionUpdate> {
        self.stats.messages_received += 1;
        match self.normalizer.normalize(payload) {
            Ok(position) => Some(self.on_position(&position)),
            Err(e) => {
                self.stats.positions_rejected += 1;
                warn!(error = %e, "Dropping position payload");
                None
            }
        }
    }

    /// Match an accepted position and switch the active hole when it moved.
    pub fn on_position(&mut self, position: &Position) -> PositionUpdate {
        self.stats.positions_accepted += 1;
        self.stats.last_position = Some(LastPosition::from(position));

        if self.session.is_none() {
            return PositionUpdate::Inactive;
        }

        let project_id = self.project_id();
        if let Some(pid) = project_id {
            self.registry
                .spawn_refresh_if_stale(Arc::clone(&self.api), pid);
        }

        let snapshot = self.registry.snapshot();
        let (hole, distance_m) = match self.matcher.find(position, &snapshot) {
            MatchOutcome::Matched { hole, distance_m } => (hole.clone(), distance_m),
            MatchOutcome::OutOfRange {
                nearest,
                distance_m,
            } => {
                debug!(
                    nearest = %nearest.local_id,
                    distance = %format_distance(distance_m),
                    "No hole within matching radius"
                );
                return PositionUpdate::Unmatched;
            }
            MatchOutcome::NoCandidates => {
                debug!("No surveyed holes to match against");
                return PositionUpdate::Unmatched;
            }
        };
        self.stats.matches += 1;

        let Some(session) = self.session.as_mut() else {
            return PositionUpdate::Inactive;
        };
        let previous = session.active_hole_id().map(str::to_string);
        if previous.as_deref() == Some(hole.local_id.as_str()) {
            return PositionUpdate::Unchanged {
                hole: hole.local_id,
            };
        }

        info!(
            from = previous.as_deref().unwrap_or("-"),
            to = %hole.local_id,
            distance = %format_distance(distance_m),
            depth_m = hole.depth,
            "Active hole changed"
        );
        let to = hole.local_id.clone();
        session.switch_to(hole);
        self.stats.hole_switches += 1;

        if self.uploader.state() == UploaderState::Idle {
            if self.uploader.start(project_id, session.active_hole.as_ref()) {
                session.state = self.uploader.state();
            }
        }

        PositionUpdate::Switched {
            from: previous,
            to,
            distance_m,
        }
    }

    /// Record a depth reading for the active hole and queue it for upload.
    ///
    /// Returns whether the reading went into the upload buffer.
    pub fn on_measurement(&mut self, measurement: DepthMeasurement) -> bool {
        self.stats.measurements += 1;
        let Some(session) = self.session.as_mut() else {
            debug!(depth_m = measurement.depth_m, "Measurement outside a session ignored");
            return false;
        };

        session.current_depth = measurement.depth_m;
        match session.active_hole.as_ref().and_then(Hole::upload_target) {
            Some(target) => {
                self.buffer.set(measurement, target);
                true
            }
            None => {
                debug!(
                    hole = session.active_hole_id().unwrap_or("-"),
                    depth_m = measurement.depth_m,
                    "No uploadable hole, depth tracked locally"
                );
                false
            }
        }
    }

    /// Reload the registry from the remote API now.
    pub async fn refresh_registry(&self) -> Result<usize, ApiError> {
        match self.project_id() {
            Some(pid) => self.registry.refresh(&self.api, pid).await,
            None => {
                warn!("No API project id configured, registry not refreshed");
                Ok(self.registry.snapshot().len())
            }
        }
    }

    /// Swap in holes from local metadata.
    pub fn replace_registry(&self, holes: Vec<Hole>) {
        self.registry.replace(HoleRegistry::from_holes(holes));
    }

    pub fn registry(&self) -> Arc<HoleRegistry> {
        self.registry.snapshot()
    }

    /// Stop recording: final upload flush, then discard the session.
    pub async fn stop_session(&mut self) -> Option<SessionSummary> {
        self.session.as_ref()?;

        if let Some(session) = self.session.as_mut() {
            session.state = UploaderState::Stopping;
        }
        self.uploader.stop().await;

        let summary = self.summary();
        self.session = None;
        self.buffer.clear();

        info!(summary = %summary, "Recording session stopped");
        Some(summary)
    }

    /// Current session, with upload progress filled in.
    pub fn session(&self) -> Option<DrillingSession> {
        let mut session = self.session.clone()?;
        let upload = self.uploader.stats();
        if let Some(last) = upload.last_sent {
            session.last_sent_depth = Some(last.depth_m);
            session.last_sent_at = Some(last.at);
        }
        session.state = self.uploader.state();
        Some(session)
    }

    pub fn summary(&self) -> SessionSummary {
        let session = self.session.as_ref();
        SessionSummary {
            active_hole: session.and_then(|s| s.active_hole_id().map(str::to_string)),
            current_depth: session.map(|s| s.current_depth),
            duration_secs: session.map(|s| (Utc::now() - s.started_at).num_seconds()),
            ingest: self.stats.clone(),
            upload: self.uploader.stats(),
        }
    }

    pub fn uploader_state(&self) -> UploaderState {
        self.uploader.state()
    }
}

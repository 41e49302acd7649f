//! Periodic uploader: drains the telemetry buffer on a fixed cadence
//!
//! ```text
//! Idle --start()--> Running --stop()--> Stopping --final flush--> Idle
//! ```
//!
//! The cycle runs on its own tokio task. `stop()` cancels it cooperatively,
//! waits for any in-flight cycle to finish, then performs one last drain and
//! upload before returning.

use super::buffer::{PendingUpload, TelemetryBuffer};
use crate::api::{ApiError, DrillingSpeedSample, SharedApi};
use crate::config::defaults::MIN_UPLOAD_INTERVAL_MS;
use crate::config::UploadEndpoint;
use crate::types::{Hole, UploadTarget};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UploaderState {
    Idle,
    Running,
    Stopping,
}

impl std::fmt::Display for UploaderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploaderState::Idle => write!(f, "idle"),
            UploaderState::Running => write!(f, "running"),
            UploaderState::Stopping => write!(f, "stopping"),
        }
    }
}

/// The most recent successful upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastSent {
    pub depth_m: f64,
    pub hole: UploadTarget,
    pub at: DateTime<Utc>,
}

/// Point-in-time uploader counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadStats {
    /// Periodic cycles run (the final flush is not a cycle)
    pub cycles: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub last_sent: Option<LastSent>,
}

#[derive(Debug, Default)]
struct UploadCounters {
    cycles: AtomicU64,
    sent: AtomicU64,
    failed: AtomicU64,
    last_sent: Mutex<Option<LastSent>>,
}

impl UploadCounters {
    fn record_sent(&self, pending: &PendingUpload) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last_sent.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(LastSent {
            depth_m: pending.measurement.depth_m,
            hole: pending.target.clone(),
            at: Utc::now(),
        });
    }

    fn snapshot(&self) -> UploadStats {
        UploadStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            total_sent: self.sent.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
            last_sent: self
                .last_sent
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }
}

/// Everything one upload attempt needs, shared with the cycle task.
struct UploadContext {
    api: SharedApi,
    buffer: Arc<TelemetryBuffer>,
    project_id: i64,
    endpoint: UploadEndpoint,
    sensor_id: String,
    counters: Arc<UploadCounters>,
}

impl UploadContext {
    /// One periodic cycle. A failed value goes back into the buffer unless
    /// something newer replaced it meanwhile.
    async fn cycle(&self) {
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        let Some((pending, generation)) = self.buffer.drain_if_dirty() else {
            return;
        };
        if !self.upload(&pending).await && self.buffer.restore_if_clean(generation) {
            debug!(hole = %pending.target, "Depth kept for retry next cycle");
        }
    }

    /// Last drain before teardown; failures are only logged.
    async fn flush(&self) {
        if let Some((pending, _)) = self.buffer.drain_if_dirty() {
            if !self.upload(&pending).await {
                warn!(hole = %pending.target, depth_m = pending.measurement.depth_m, "Final depth flush failed");
            }
        }
    }

    async fn upload(&self, pending: &PendingUpload) -> bool {
        match self.send(pending).await {
            Ok(()) => {
                self.counters.record_sent(pending);
                debug!(
                    hole = %pending.target,
                    depth_m = pending.measurement.depth_m,
                    endpoint = %self.endpoint,
                    "Depth uploaded"
                );
                true
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(hole = %pending.target, error = %e, "Depth upload failed");
                false
            }
        }
    }

    async fn send(&self, pending: &PendingUpload) -> Result<(), ApiError> {
        let remote_id = pending.target.remote_id;
        match self.endpoint {
            UploadEndpoint::Depth => {
                self.api
                    .update_hole_depth(self.project_id, remote_id, pending.measurement.depth_m)
                    .await
            }
            UploadEndpoint::DrillingSpeed => {
                let sample = DrillingSpeedSample {
                    speed: pending.measurement.velocity_ms.unwrap_or(0.0),
                    depth: pending.measurement.depth_m,
                    timestamp: pending.measurement.measured_at,
                    sensor_id: Some(self.sensor_id.clone()).filter(|s| !s.is_empty()),
                };
                self.api
                    .post_drilling_speed(self.project_id, remote_id, &sample)
                    .await
            }
        }
    }
}

struct CycleTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    ctx: Arc<UploadContext>,
}

/// Uploads the buffered depth every `interval` while running.
pub struct PeriodicUploader {
    api: SharedApi,
    buffer: Arc<TelemetryBuffer>,
    interval: Duration,
    endpoint: UploadEndpoint,
    sensor_id: String,
    counters: Arc<UploadCounters>,
    state: UploaderState,
    task: Option<CycleTask>,
}

impl PeriodicUploader {
    pub fn new(
        api: SharedApi,
        buffer: Arc<TelemetryBuffer>,
        interval: Duration,
        endpoint: UploadEndpoint,
        sensor_id: impl Into<String>,
    ) -> Self {
        if interval.is_zero() {
            warn!(
                fallback_ms = MIN_UPLOAD_INTERVAL_MS,
                "Zero upload interval, using minimum"
            );
        }
        Self {
            api,
            buffer,
            interval: interval.max(Duration::from_millis(MIN_UPLOAD_INTERVAL_MS)),
            endpoint,
            sensor_id: sensor_id.into(),
            counters: Arc::new(UploadCounters::default()),
            state: UploaderState::Idle,
            task: None,
        }
    }

    /// Begin periodic uploads for a project.
    ///
    /// Without a project id or a hole with a remote id this does nothing and
    /// the uploader stays `Idle`. Must be called inside a tokio runtime.
    pub fn start(&mut self, project_id: Option<i64>, hole: Option<&Hole>) -> bool {
        if self.state != UploaderState::Idle {
            debug!(state = %self.state, "Uploader already started");
            return self.state == UploaderState::Running;
        }

        let Some(project_id) = project_id else {
            warn!("No API project id configured, depth uploads disabled");
            return false;
        };
        let Some(target) = hole.and_then(Hole::upload_target) else {
            match hole {
                Some(h) => warn!(hole = %h.local_id, "Hole has no remote id, depth uploads disabled"),
                None => warn!("No active hole, depth uploads disabled"),
            }
            return false;
        };

        self.counters = Arc::new(UploadCounters::default());
        let ctx = Arc::new(UploadContext {
            api: Arc::clone(&self.api),
            buffer: Arc::clone(&self.buffer),
            project_id,
            endpoint: self.endpoint,
            sensor_id: self.sensor_id.clone(),
            counters: Arc::clone(&self.counters),
        });
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_cycles(Arc::clone(&ctx), self.interval, cancel.clone()));

        self.task = Some(CycleTask {
            cancel,
            handle,
            ctx,
        });
        self.state = UploaderState::Running;
        info!(
            project_id,
            hole = %target,
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            endpoint = %self.endpoint,
            api = %self.api.base_url(),
            "Depth uploader started"
        );
        true
    }

    /// Stop the cycle and flush once.
    ///
    /// Returns after the in-flight cycle and the final upload attempt have
    /// both completed. No cycle fires afterwards.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.state = UploaderState::Stopping;

        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            warn!(error = %e, "Uploader task ended abnormally");
        }
        task.ctx.flush().await;

        self.state = UploaderState::Idle;
        let stats = self.stats();
        info!(
            cycles = stats.cycles,
            sent = stats.total_sent,
            failed = stats.total_failed,
            "Depth uploader stopped"
        );
    }

    pub fn state(&self) -> UploaderState {
        self.state
    }

    /// Counters of the current or most recent run.
    pub fn stats(&self) -> UploadStats {
        self.counters.snapshot()
    }

    /// Zero the counters. Ignored while a run is in progress.
    pub fn reset_stats(&mut self) {
        if self.state == UploaderState::Idle {
            self.counters = Arc::new(UploadCounters::default());
        }
    }
}

async fn run_cycles(ctx: Arc<UploadContext>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => ctx.cycle().await,
        }
    }
}

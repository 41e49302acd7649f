//! Shared test fixtures: an in-memory holes API and a small survey site.

#![allow(dead_code)]

use async_trait::async_trait;
use holetrack::api::{ApiError, DrillingSpeedSample, HolesApi};
use holetrack::config::ProjectConfig;
use holetrack::types::Hole;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PROJECT_ID: i64 = 5;

/// Hole A collar.
pub const SITE_A: (f64, f64) = (20.995293, 107.149251);
/// Hole B collar, roughly 110 m north-east of A.
pub const SITE_B: (f64, f64) = (20.996000, 107.150000);

pub fn site_holes() -> Vec<Hole> {
    vec![
        Hole::new("LK1")
            .with_remote_id(101)
            .with_coordinates(SITE_A.0, SITE_A.1, Some(12.0))
            .with_depth(3.0),
        Hole::new("LK2")
            .with_remote_id(102)
            .with_coordinates(SITE_B.0, SITE_B.1, None)
            .with_depth(7.5),
        Hole::new("LK3").with_remote_id(103),
    ]
}

pub fn project_config(project_id: Option<i64>) -> Arc<ProjectConfig> {
    let mut config = ProjectConfig::default();
    config.project.name = "Test Quarry".to_string();
    config.project.api_project_id = project_id;
    Arc::new(config)
}

/// In-memory stand-in for the remote holes API.
#[derive(Default)]
pub struct FakeHolesApi {
    holes: Mutex<Vec<Hole>>,
    offline: AtomicBool,
    upload_failures_left: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub depth_updates: Mutex<Vec<(i64, f64)>>,
    pub speed_posts: Mutex<Vec<(i64, DrillingSpeedSample)>>,
}

impl FakeHolesApi {
    pub fn with_holes(holes: Vec<Hole>) -> Self {
        Self {
            holes: Mutex::new(holes),
            ..Default::default()
        }
    }

    /// Every call fails with a transport-like error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// The next `n` uploads fail.
    pub fn fail_next_uploads(&self, n: usize) {
        self.upload_failures_left.store(n, Ordering::SeqCst);
    }

    pub fn depth_updates(&self) -> Vec<(i64, f64)> {
        self.depth_updates.lock().unwrap().clone()
    }

    fn check_online(&self) -> Result<(), ApiError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::ServerError(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(())
    }

    fn check_upload(&self) -> Result<(), ApiError> {
        self.check_online()?;
        let left = self.upload_failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.upload_failures_left.store(left - 1, Ordering::SeqCst);
            return Err(ApiError::ServerError(reqwest::StatusCode::BAD_GATEWAY));
        }
        Ok(())
    }
}

#[async_trait]
impl HolesApi for FakeHolesApi {
    async fn list_holes(&self, _project_id: i64) -> Result<Vec<Hole>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        Ok(self.holes.lock().unwrap().clone())
    }

    async fn get_hole(&self, _project_id: i64, hole_ref: &str) -> Result<Hole, ApiError> {
        self.check_online()?;
        self.holes
            .lock()
            .unwrap()
            .iter()
            .find(|h| {
                h.local_id == hole_ref || h.remote_id.map(|id| id.to_string()).as_deref() == Some(hole_ref)
            })
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn update_hole_depth(
        &self,
        _project_id: i64,
        remote_id: i64,
        depth_m: f64,
    ) -> Result<(), ApiError> {
        self.check_upload()?;
        self.depth_updates.lock().unwrap().push((remote_id, depth_m));
        Ok(())
    }

    async fn post_drilling_speed(
        &self,
        _project_id: i64,
        remote_id: i64,
        sample: &DrillingSpeedSample,
    ) -> Result<(), ApiError> {
        self.check_upload()?;
        self.speed_posts.lock().unwrap().push((remote_id, sample.clone()));
        Ok(())
    }

    fn base_url(&self) -> &str {
        "memory://holes"
    }
}

//! Remote holes API
//!
//! The core only sees the [`HolesApi`] trait; [`HttpHolesClient`] is the
//! production implementation and tests substitute in-memory fakes.
//!
//! Every call is fallible and network-bound. Depth updates are last write
//! wins on the server side.

pub mod client;
pub mod types;

pub use client::{ApiError, HttpHolesClient};
pub use types::{DrillingSpeedSample, RemoteHole};

use crate::types::Hole;
use async_trait::async_trait;
use std::sync::Arc;

/// Operations the sync core needs from the remote tracking service.
#[async_trait]
pub trait HolesApi: Send + Sync {
    /// All holes of a project, in server order.
    async fn list_holes(&self, project_id: i64) -> Result<Vec<Hole>, ApiError>;

    /// One hole by remote id or local id string. Unknown holes are
    /// [`ApiError::NotFound`].
    async fn get_hole(&self, project_id: i64, hole_ref: &str) -> Result<Hole, ApiError>;

    /// Overwrite the hole's recorded depth (m).
    async fn update_hole_depth(
        &self,
        project_id: i64,
        remote_id: i64,
        depth_m: f64,
    ) -> Result<(), ApiError>;

    /// Record a drilling speed sample against the hole.
    async fn post_drilling_speed(
        &self,
        project_id: i64,
        remote_id: i64,
        sample: &DrillingSpeedSample,
    ) -> Result<(), ApiError>;

    /// For logging.
    fn base_url(&self) -> &str;
}

pub type SharedApi = Arc<dyn HolesApi>;

//! Project Configuration Module
//!
//! Provides per-project configuration loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. `HOLETRACK_CONFIG` environment variable (path to TOML file)
//! 2. `holetrack.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The loaded config is immutable for the lifetime of a session and is
//! handed to collaborators as an `Arc<ProjectConfig>`:
//!
//! ```ignore
//! let config = Arc::new(ProjectConfig::load());
//! let coordinator = SyncCoordinator::new(Arc::clone(&config), api);
//! ```

mod project_config;
pub mod defaults;
pub mod validation;

pub use project_config::*;

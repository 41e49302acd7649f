//! Project Configuration - remote API, GNSS matching and upload settings
//!
//! Every tunable has a `Default` matching the constants in
//! [`defaults`](super::defaults), so a missing config file still yields a
//! working (if offline) setup.

use super::defaults;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable pointing at a project config file.
pub const CONFIG_ENV_VAR: &str = "HOLETRACK_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "holetrack.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one drilling project.
///
/// Load with `ProjectConfig::load()` which searches:
/// 1. `$HOLETRACK_CONFIG` env var
/// 2. `./holetrack.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project identification
    #[serde(default)]
    pub project: ProjectInfo,

    /// Remote holes API
    #[serde(default)]
    pub api: ApiConfig,

    /// Position transport (external MQTT bridge)
    #[serde(default)]
    pub mqtt: MqttConfig,

    /// Position-to-hole matching
    #[serde(default)]
    pub gnss: GnssConfig,

    /// Periodic telemetry upload
    #[serde(default)]
    pub upload: UploadConfig,
}

impl ProjectConfig {
    /// Load configuration using the standard search order.
    ///
    /// Never fails: unreadable or invalid files are logged and skipped.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), project = %config.project.name, "Loaded project config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(project = %config.project.name, "Loaded project config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys only produce warnings; type errors and failed
    /// validation are errors.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every value the runtime relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if let Some(id) = self.project.api_project_id {
            if id <= 0 {
                errors.push(format!("project.api_project_id must be > 0, got {id}"));
            }
        }

        let url = self.api.base_url.trim();
        if url.is_empty() {
            errors.push("api.base_url must not be empty".to_string());
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!(
                "api.base_url must start with http:// or https://, got '{url}'"
            ));
        }
        if self.api.timeout_secs == 0 {
            errors.push("api.timeout_secs must be > 0".to_string());
        }

        if self.mqtt.broker_port == 0 {
            errors.push("mqtt.broker_port must be > 0".to_string());
        }

        let d = self.gnss.max_distance_m;
        if !d.is_finite() || d <= 0.0 {
            errors.push(format!(
                "gnss.max_distance_m must be a finite number > 0, got {d}"
            ));
        }

        if self.upload.interval_secs == 0 {
            errors.push("upload.interval_secs must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// One-line description for startup logs.
    pub fn describe(&self) -> String {
        format!(
            "project={} api_project_id={} api={} mqtt={}:{}/{} radius={:.1}m upload={}s/{}",
            if self.project.name.is_empty() { "unset" } else { &self.project.name },
            self.project
                .api_project_id
                .map_or_else(|| "none".to_string(), |id| id.to_string()),
            self.api.base_url,
            self.mqtt.broker_host,
            self.mqtt.broker_port,
            self.mqtt.topic,
            self.gnss.max_distance_m,
            self.upload.interval_secs,
            self.upload.endpoint,
        )
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// Project identification and remote binding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Human-readable project name (logs only)
    #[serde(default)]
    pub name: String,

    /// Project id on the remote holes API. Upload stays disabled without it.
    #[serde(default)]
    pub api_project_id: Option<i64>,
}

/// Remote holes API endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    defaults::API_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    defaults::API_HTTP_TIMEOUT_SECS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// MQTT broker the GNSS receivers publish to.
///
/// The broker connection itself lives outside this crate; these values are
/// handed to whatever bridge feeds [`crate::pipeline::source`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_broker_host")]
    pub broker_host: String,

    #[serde(default = "default_broker_port")]
    pub broker_port: u16,

    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_broker_host() -> String {
    defaults::MQTT_BROKER_HOST.to_string()
}
fn default_broker_port() -> u16 {
    defaults::MQTT_BROKER_PORT
}
fn default_topic() -> String {
    defaults::MQTT_TOPIC.to_string()
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: default_broker_host(),
            broker_port: default_broker_port(),
            topic: default_topic(),
        }
    }
}

/// Position-to-hole matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GnssConfig {
    /// Maximum distance (m) at which a position counts as "at" a hole
    #[serde(default = "default_max_distance")]
    pub max_distance_m: f64,

    /// Seconds before the cached hole registry is considered stale
    #[serde(default = "default_registry_ttl")]
    pub registry_ttl_secs: u64,
}

fn default_max_distance() -> f64 {
    defaults::GNSS_MAX_DISTANCE_M
}
fn default_registry_ttl() -> u64 {
    defaults::REGISTRY_TTL_SECS
}

impl Default for GnssConfig {
    fn default() -> Self {
        Self {
            max_distance_m: default_max_distance(),
            registry_ttl_secs: default_registry_ttl(),
        }
    }
}

/// Which remote call carries the buffered measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadEndpoint {
    /// `PUT /projects/{p}/holes/{h}` with `{"depth": ..}`
    #[default]
    Depth,
    /// `POST /projects/{p}/holes/{h}/drilling-speed`
    DrillingSpeed,
}

impl std::fmt::Display for UploadEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadEndpoint::Depth => write!(f, "depth"),
            UploadEndpoint::DrillingSpeed => write!(f, "drilling_speed"),
        }
    }
}

/// Periodic upload of drilling progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Cycle cadence in seconds
    #[serde(default = "default_upload_interval")]
    pub interval_secs: u64,

    /// Sensor id sent with drilling-speed posts
    #[serde(default = "default_sensor_id")]
    pub sensor_id: String,

    #[serde(default)]
    pub endpoint: UploadEndpoint,
}

fn default_upload_interval() -> u64 {
    defaults::UPLOAD_INTERVAL_SECS
}
fn default_sensor_id() -> String {
    defaults::UPLOAD_SENSOR_ID.to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_upload_interval(),
            sensor_id: default_sensor_id(),
            endpoint: UploadEndpoint::default(),
        }
    }
}

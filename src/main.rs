//! holetrack binary
//!
//! Reads GNSS positions and depth readings from stdin, a TCP line feed or a
//! replay file, matches the rig to the nearest surveyed hole and uploads
//! drilling depth to the project's holes API until input ends or Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use holetrack::api::{HttpHolesClient, SharedApi};
use holetrack::config::{self, ProjectConfig};
use holetrack::pipeline::{IngestLoop, PositionSource, ReplaySource, StdinSource, TcpSource};
use holetrack::session::SyncCoordinator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "holetrack")]
#[command(about = "GNSS drill-hole correlation and depth telemetry uploader")]
#[command(version)]
struct CliArgs {
    /// Project config file (overrides $HOLETRACK_CONFIG and ./holetrack.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Read NMEA / JSON lines from stdin (default input)
    #[arg(long)]
    stdin: bool,

    /// Read lines from a TCP feed
    /// Example: holetrack --tcp 192.168.1.50:5017
    #[arg(long, value_name = "HOST:PORT")]
    tcp: Option<String>,

    /// Replay a recorded log file
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Delay between replayed lines in ms (0 = no delay)
    #[arg(long, default_value_t = config::defaults::REPLAY_DELAY_MS)]
    speed_ms: u64,

    /// Local id of the hole being drilled, if known up front
    #[arg(long, value_name = "LOCAL_ID", env = "HOLETRACK_HOLE")]
    hole: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

async fn open_source(args: &CliArgs) -> Result<Box<dyn PositionSource>> {
    if let Some(addr) = &args.tcp {
        info!(addr = %addr, "📥 Input: TCP line feed");
        return Ok(Box::new(TcpSource::connect(addr).await?));
    }
    if let Some(path) = &args.replay {
        let source = ReplaySource::from_file(path, args.speed_ms).await?;
        info!(
            file = %path.display(),
            events = source.remaining(),
            delay_ms = args.speed_ms,
            "📥 Input: replay"
        );
        return Ok(Box::new(source));
    }
    if !args.stdin {
        info!("No input selected, reading stdin");
    }
    info!("📥 Input: stdin");
    Ok(Box::new(StdinSource::new()))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let project_config = match &args.config {
        Some(path) => ProjectConfig::load_from_file(path)
            .with_context(|| format!("Invalid config {}", path.display()))?,
        None => ProjectConfig::load(),
    };
    info!("Config: {}", project_config.describe());
    let project_config = Arc::new(project_config);

    let client = HttpHolesClient::new(
        &project_config.api.base_url,
        Duration::from_secs(project_config.api.timeout_secs),
    )?;
    if client.ping().await {
        info!(api = %project_config.api.base_url, "Holes API reachable");
    } else {
        warn!(api = %project_config.api.base_url, "Holes API not reachable, uploads will retry each cycle");
    }
    let api: SharedApi = Arc::new(client);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, stopping ingestion...");
        shutdown_token.cancel();
    });

    let mut source = open_source(&args).await?;

    let mut coordinator = SyncCoordinator::new(Arc::clone(&project_config), api);
    coordinator.start_session(args.hole.as_deref()).await;

    let exit = IngestLoop::new(cancel_token)
        .run(source.as_mut(), &mut coordinator)
        .await;
    info!(reason = ?exit, "Ingestion finished");

    if let Some(summary) = coordinator.stop_session().await {
        info!("Session: {}", summary);
    }

    info!("✓ holetrack shutdown complete");
    Ok(())
}

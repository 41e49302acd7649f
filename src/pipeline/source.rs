//! Inbound event sources.
//!
//! A unified trait for reading GNSS positions and depth readings from
//! different transports: stdin, a TCP line feed, and file replay. All three
//! speak the same line protocol:
//!
//! - `$..GGA,...` NMEA sentences are positions
//! - JSON objects with a numeric `depth` are depth measurements
//!   (`{"depth": 12.4, "velocity": 0.03, "timestamp": "2025-12-03T10:30:00Z"}`)
//! - any other JSON object is a position payload for the normalizer

use crate::gnss::RawPayload;
use crate::types::DepthMeasurement;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::warn;

/// Events produced by a source.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A position payload, not yet normalized
    Position(RawPayload),
    /// A reading from the depth/drilling-speed sensor
    Measurement(DepthMeasurement),
    /// No more data (EOF, or the peer closed the connection)
    Eof,
}

/// Where inbound events come from.
///
/// The ingestion loop calls [`next_event`](PositionSource::next_event) in a
/// `select!` with cancellation.
#[async_trait]
pub trait PositionSource: Send {
    /// Read the next event. `Err` only for unrecoverable I/O failures.
    async fn next_event(&mut self) -> Result<InboundEvent>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

/// Classify one line of input. Blank lines and unusable measurement lines
/// yield `None`.
pub fn classify_line(line: &str) -> Option<InboundEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.starts_with('$') {
        return Some(InboundEvent::Position(RawPayload::Text(line.to_string())));
    }

    let map = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(map)) => map,
        // Let the normalizer reject it so it shows up in the counters.
        _ => return Some(InboundEvent::Position(RawPayload::Text(line.to_string()))),
    };

    let Some(depth) = map.get("depth") else {
        return Some(InboundEvent::Position(RawPayload::Fields(map)));
    };
    let Some(depth_m) = depth.as_f64() else {
        warn!(line, "Depth reading without numeric depth, skipped");
        return None;
    };

    let mut measurement = DepthMeasurement::new(depth_m);
    if let Some(v) = map.get("velocity").and_then(Value::as_f64) {
        measurement = measurement.with_velocity(v);
    }
    if let Some(ts) = map.get("timestamp").and_then(Value::as_str) {
        match DateTime::parse_from_rfc3339(ts) {
            Ok(t) => measurement = measurement.at(t.with_timezone(&Utc)),
            Err(e) => warn!(timestamp = ts, error = %e, "Bad measurement timestamp, using receive time"),
        }
    }
    Some(InboundEvent::Measurement(measurement))
}

// ============================================================================
// Line reader (shared by stdin and TCP)
// ============================================================================

struct LineReader<R> {
    reader: R,
    line_buffer: String,
}

impl<R: AsyncBufRead + Unpin + Send> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            line_buffer: String::with_capacity(512),
        }
    }

    async fn next_event(&mut self) -> Result<InboundEvent> {
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(InboundEvent::Eof);
            }
            if let Some(event) = classify_line(&self.line_buffer) {
                return Ok(event);
            }
        }
    }
}

// ============================================================================
// Stdin Source
// ============================================================================

/// Reads lines from stdin.
///
/// `cat gnss.log | holetrack --stdin`
pub struct StdinSource {
    lines: LineReader<BufReader<tokio::io::Stdin>>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            lines: LineReader::new(BufReader::new(tokio::io::stdin())),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PositionSource for StdinSource {
    async fn next_event(&mut self) -> Result<InboundEvent> {
        self.lines.next_event().await
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

// ============================================================================
// TCP Source
// ============================================================================

/// Reads lines from a TCP feed (an NMEA/JSON bridge in front of the
/// receiver). A closed connection is reported as `Eof`.
pub struct TcpSource {
    lines: LineReader<BufReader<tokio::net::TcpStream>>,
    name: String,
}

impl TcpSource {
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = tokio::net::TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to {addr}"))?;
        Ok(Self {
            lines: LineReader::new(BufReader::new(stream)),
            name: format!("tcp://{addr}"),
        })
    }
}

#[async_trait]
impl PositionSource for TcpSource {
    async fn next_event(&mut self) -> Result<InboundEvent> {
        self.lines.next_event().await
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Replay Source
// ============================================================================

/// Replays pre-loaded events with an optional delay between them.
pub struct ReplaySource {
    events: std::vec::IntoIter<InboundEvent>,
    delay_ms: u64,
    yielded_first: bool,
}

impl ReplaySource {
    pub fn new(events: Vec<InboundEvent>, delay_ms: u64) -> Self {
        Self {
            events: events.into_iter(),
            delay_ms,
            yielded_first: false,
        }
    }

    /// Load a recorded log, one event per line.
    pub async fn from_file(path: &Path, delay_ms: u64) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read replay file {}", path.display()))?;
        let events: Vec<InboundEvent> = contents.lines().filter_map(classify_line).collect();
        Ok(Self::new(events, delay_ms))
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl PositionSource for ReplaySource {
    async fn next_event(&mut self) -> Result<InboundEvent> {
        // No delay before the first event.
        if self.yielded_first && self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }
        match self.events.next() {
            Some(event) => {
                self.yielded_first = true;
                Ok(event)
            }
            None => Ok(InboundEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}

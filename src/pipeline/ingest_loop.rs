//! Cancellable ingestion loop shared across all input modes.

use super::source::{InboundEvent, PositionSource};
use crate::session::SyncCoordinator;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Why the loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestExit {
    Cancelled,
    Eof,
    SourceError(String),
}

/// Feeds source events into the coordinator until the source ends or the
/// token is cancelled. Never waits on uploads.
pub struct IngestLoop {
    cancel_token: CancellationToken,
}

impl IngestLoop {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self { cancel_token }
    }

    pub async fn run<S: PositionSource + ?Sized>(
        &self,
        source: &mut S,
        coordinator: &mut SyncCoordinator,
    ) -> IngestExit {
        let name = source.source_name().to_string();
        info!(source = %name, "Ingesting events");
        let mut events = 0u64;

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    info!(events, "Ingestion cancelled");
                    return IngestExit::Cancelled;
                }
                result = source.next_event() => match result {
                    Ok(ev) => ev,
                    Err(e) => {
                        warn!(source = %name, error = %e, "Source error, stopping ingestion");
                        return IngestExit::SourceError(e.to_string());
                    }
                }
            };

            match event {
                InboundEvent::Position(payload) => {
                    coordinator.on_payload(&payload);
                }
                InboundEvent::Measurement(m) => {
                    coordinator.on_measurement(m);
                }
                InboundEvent::Eof => {
                    info!(events, "Source reached end");
                    return IngestExit::Eof;
                }
            }
            events += 1;
        }
    }
}

//! Ingestion pipeline
//!
//! ```text
//! PositionSource (stdin | tcp | replay)
//!     -> IngestLoop (select! on CancellationToken)
//!     -> SyncCoordinator::{on_payload, on_measurement}
//! ```

pub mod ingest_loop;
pub mod source;

pub use ingest_loop::{IngestExit, IngestLoop};
pub use source::{classify_line, InboundEvent, PositionSource, ReplaySource, StdinSource, TcpSource};

//! Single-slot coalescing buffer between ingestion and the uploader
//!
//! `set` overwrites, `drain_if_dirty` takes. Values written between two
//! drains are never queued individually; only the latest survives.

use crate::types::{DepthMeasurement, UploadTarget};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// The latest measurement and the hole it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub measurement: DepthMeasurement,
    pub target: UploadTarget,
}

#[derive(Debug, Default)]
struct Slot {
    value: Option<PendingUpload>,
    dirty: bool,
    /// Bumped on every `set`, so a failed upload can tell whether it was
    /// superseded while in flight.
    generation: u64,
}

/// Shared between the coordinator (writer) and the uploader (reader).
#[derive(Debug, Default)]
pub struct TelemetryBuffer {
    slot: Mutex<Slot>,
}

impl TelemetryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot and mark it dirty.
    pub fn set(&self, measurement: DepthMeasurement, target: UploadTarget) {
        let mut slot = self.lock();
        slot.value = Some(PendingUpload {
            measurement,
            target,
        });
        slot.dirty = true;
        slot.generation += 1;
    }

    /// Take the value if it changed since the last drain.
    ///
    /// Returns the drained value with its generation, for
    /// [`restore_if_clean`](Self::restore_if_clean).
    pub fn drain_if_dirty(&self) -> Option<(PendingUpload, u64)> {
        let mut slot = self.lock();
        if !slot.dirty {
            return None;
        }
        slot.dirty = false;
        let value = slot.value.clone()?;
        Some((value, slot.generation))
    }

    /// Re-mark a failed upload as pending, unless a newer `set` arrived since
    /// it was drained. Returns whether the value was restored.
    pub fn restore_if_clean(&self, generation: u64) -> bool {
        let mut slot = self.lock();
        if slot.generation != generation || slot.dirty {
            return false;
        }
        slot.dirty = slot.value.is_some();
        slot.dirty
    }

    /// Current value without touching dirtiness.
    pub fn peek(&self) -> Option<PendingUpload> {
        self.lock().value.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    /// Empty the slot; used when a session ends.
    pub fn clear(&self) {
        let mut slot = self.lock();
        slot.value = None;
        slot.dirty = false;
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| {
            warn!("Telemetry buffer mutex poisoned, recovering");
            e.into_inner()
        })
    }
}

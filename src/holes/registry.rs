//! Hole registry snapshots
//!
//! A [`HoleRegistry`] is never patched in place. Refreshes build a complete
//! new registry and swap it into the [`RegistryStore`], so a matching pass
//! always sees one consistent snapshot.

use crate::api::{ApiError, SharedApi};
use crate::types::{Hole, HoleCoordinates};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Ordered, read-only set of holes keyed by local id.
#[derive(Debug, Clone, Default)]
pub struct HoleRegistry {
    holes: Vec<Hole>,
    by_local_id: HashMap<String, usize>,
}

impl HoleRegistry {
    /// Build a registry preserving input order.
    ///
    /// Later holes reusing an existing local id are dropped with a warning.
    pub fn from_holes(holes: impl IntoIterator<Item = Hole>) -> Self {
        let mut registry = Self::default();
        for hole in holes {
            if registry.by_local_id.contains_key(&hole.local_id) {
                warn!(hole = %hole.local_id, "Duplicate hole id in registry, keeping first");
                continue;
            }
            registry
                .by_local_id
                .insert(hole.local_id.clone(), registry.holes.len());
            registry.holes.push(hole);
        }
        registry
    }

    pub fn get(&self, local_id: &str) -> Option<&Hole> {
        self.by_local_id.get(local_id).map(|&i| &self.holes[i])
    }

    pub fn find_by_remote_id(&self, remote_id: i64) -> Option<&Hole> {
        self.holes.iter().find(|h| h.remote_id == Some(remote_id))
    }

    /// All holes in registry order.
    pub fn holes(&self) -> &[Hole] {
        &self.holes
    }

    /// Holes that can take part in matching, in registry order.
    pub fn with_coordinates(&self) -> impl Iterator<Item = (&Hole, &HoleCoordinates)> {
        self.holes
            .iter()
            .filter_map(|h| h.coordinates.as_ref().map(|c| (h, c)))
    }

    pub fn len(&self) -> usize {
        self.holes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holes.is_empty()
    }
}

/// Holds the current registry snapshot for the active project.
///
/// Readers take an `Arc` to the snapshot and keep using it even if a refresh
/// swaps in a newer one mid-pass.
pub struct RegistryStore {
    current: ArcSwap<HoleRegistry>,
    loaded_at: Mutex<Option<Instant>>,
    ttl: Duration,
    refreshing: AtomicBool,
}

impl RegistryStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            current: ArcSwap::from_pointee(HoleRegistry::default()),
            loaded_at: Mutex::new(None),
            ttl,
            refreshing: AtomicBool::new(false),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<HoleRegistry> {
        self.current.load_full()
    }

    /// Swap in a complete new registry and mark it fresh.
    pub fn replace(&self, registry: HoleRegistry) {
        let count = registry.len();
        self.current.store(Arc::new(registry));
        *self.lock_loaded_at() = Some(Instant::now());
        debug!(holes = count, "Hole registry replaced");
    }

    /// Drop the snapshot; the next staleness check asks for a reload.
    pub fn clear(&self) {
        self.current.store(Arc::new(HoleRegistry::default()));
        *self.lock_loaded_at() = None;
    }

    /// True when no successful load happened within the TTL.
    pub fn is_stale(&self) -> bool {
        match *self.lock_loaded_at() {
            Some(at) => at.elapsed() >= self.ttl,
            None => true,
        }
    }

    /// Fetch the project's holes and swap them in.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self, api: &SharedApi, project_id: i64) -> Result<usize, ApiError> {
        let holes = api.list_holes(project_id).await?;
        let registry = HoleRegistry::from_holes(holes);
        let count = registry.len();
        self.replace(registry);
        info!(project_id, holes = count, "Loaded holes from API");
        Ok(count)
    }

    /// Refresh on a background task when stale.
    ///
    /// At most one refresh runs at a time; returns `None` when nothing was
    /// spawned.
    pub fn spawn_refresh_if_stale(
        self: &Arc<Self>,
        api: SharedApi,
        project_id: i64,
    ) -> Option<tokio::task::JoinHandle<()>> {
        if !self.is_stale() {
            return None;
        }
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let store = Arc::clone(self);
        Some(tokio::spawn(async move {
            if let Err(e) = store.refresh(&api, project_id).await {
                warn!(project_id, error = %e, "Hole registry refresh failed, keeping previous snapshot");
            }
            store.refreshing.store(false, Ordering::Release);
        }))
    }

    fn lock_loaded_at(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.loaded_at.lock().unwrap_or_else(|e| {
            warn!("Registry timestamp mutex poisoned, recovering");
            e.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_keep_first() {
        let registry = HoleRegistry::from_holes([
            Hole::new("LK1").with_depth(1.0),
            Hole::new("LK2"),
            Hole::new("LK1").with_depth(9.0),
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("LK1").unwrap().depth, 1.0);
        assert_eq!(registry.holes()[1].local_id, "LK2");
    }

    #[test]
    fn test_with_coordinates_skips_unsurveyed() {
        let registry = HoleRegistry::from_holes([
            Hole::new("A").with_coordinates(21.0, 105.0, None),
            Hole::new("B"),
            Hole::new("C").with_coordinates(21.1, 105.1, Some(4.0)),
        ]);
        let ids: Vec<&str> = registry
            .with_coordinates()
            .map(|(h, _)| h.local_id.as_str())
            .collect();
        assert_eq!(ids, ["A", "C"]);
    }

    #[test]
    fn test_find_by_remote_id() {
        let registry = HoleRegistry::from_holes([
            Hole::new("A").with_remote_id(3),
            Hole::new("B").with_remote_id(4),
        ]);
        assert_eq!(registry.find_by_remote_id(4).unwrap().local_id, "B");
        assert!(registry.find_by_remote_id(5).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_staleness_follows_ttl() {
        let store = RegistryStore::new(Duration::from_secs(300));
        assert!(store.is_stale());

        store.replace(HoleRegistry::from_holes([Hole::new("A")]));
        assert!(!store.is_stale());
        assert_eq!(store.snapshot().len(), 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(store.is_stale());

        store.clear();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_old_snapshot_survives_replace() {
        let store = RegistryStore::new(Duration::from_secs(60));
        store.replace(HoleRegistry::from_holes([Hole::new("A")]));
        let before = store.snapshot();
        store.replace(HoleRegistry::from_holes([Hole::new("B"), Hole::new("C")]));
        assert_eq!(before.holes()[0].local_id, "A");
        assert_eq!(store.snapshot().len(), 2);
    }
}

//! Replica placement
//!
//! Deterministic least-loaded selection: candidates are ordered by
//! (currently-assigned chunk count, node id) and the first `desired` are
//! taken. The selection shrinks to availability and an empty alive set
//! yields an empty selection; the caller decides whether that is a failure.

use crate::coordinator::metadata::MetadataStore;
use std::sync::Arc;

/// Placement engine
pub struct PlacementEngine {
    store: Arc<MetadataStore>,
}

impl PlacementEngine {
    pub fn new(store: Arc<MetadataStore>) -> Self {
        Self { store }
    }

    /// Select up to `desired` distinct targets from `alive`.
    pub fn choose_replicas(&self, chunk_id: &str, desired: usize, alive: &[String]) -> Vec<String> {
        if alive.is_empty() || desired == 0 {
            return Vec::new();
        }

        let load = self.store.replica_load();
        let mut candidates: Vec<(usize, &String)> = alive
            .iter()
            .map(|node| (load.get(node).copied().unwrap_or(0), node))
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        let selected: Vec<String> = candidates
            .into_iter()
            .take(desired)
            .map(|(_, node)| node.clone())
            .collect();
        tracing::debug!(chunk_id, targets = ?selected, "placement");
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::metadata::OverwritePolicy;
    use tempfile::tempdir;

    fn engine(dir: &tempfile::TempDir) -> (PlacementEngine, Arc<MetadataStore>) {
        let store = Arc::new(
            MetadataStore::open(dir.path().join("meta.json"), OverwritePolicy::Reject).unwrap(),
        );
        (PlacementEngine::new(store.clone()), store)
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_selects_desired_count() {
        let dir = tempdir().unwrap();
        let (engine, _) = engine(&dir);
        let alive = ids(&["d0", "d1", "d2"]);

        let selected = engine.choose_replicas("c1", 2, &alive);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_shrinks_to_availability() {
        let dir = tempdir().unwrap();
        let (engine, _) = engine(&dir);
        let alive = ids(&["d0"]);

        // asks for 3, gets the one node that exists
        let selected = engine.choose_replicas("c1", 3, &alive);
        assert_eq!(selected, vec!["d0"]);
    }

    #[test]
    fn test_empty_alive_set_is_empty_selection() {
        let dir = tempdir().unwrap();
        let (engine, _) = engine(&dir);
        assert!(engine.choose_replicas("c1", 2, &[]).is_empty());
    }

    #[test]
    fn test_prefers_less_loaded_nodes() {
        let dir = tempdir().unwrap();
        let (engine, store) = engine(&dir);

        // d0 already holds two chunks, d1 one, d2 none
        store.add_replica("c1", "d0").unwrap();
        store.add_replica("c2", "d0").unwrap();
        store.add_replica("c3", "d1").unwrap();

        let alive = ids(&["d0", "d1", "d2"]);
        let selected = engine.choose_replicas("c4", 2, &alive);
        assert_eq!(selected, vec!["d2", "d1"]);
    }

    #[test]
    fn test_ties_break_by_lowest_id() {
        let dir = tempdir().unwrap();
        let (engine, _) = engine(&dir);
        let alive = ids(&["d2", "d0", "d1"]);

        let selected = engine.choose_replicas("c1", 2, &alive);
        assert_eq!(selected, vec!["d0", "d1"]);
    }

    #[test]
    fn test_deterministic() {
        let dir = tempdir().unwrap();
        let (engine, store) = engine(&dir);
        store.add_replica("c1", "d1").unwrap();
        let alive = ids(&["d0", "d1", "d2"]);

        let a = engine.choose_replicas("c2", 2, &alive);
        let b = engine.choose_replicas("c2", 2, &alive);
        assert_eq!(a, b);
    }
}

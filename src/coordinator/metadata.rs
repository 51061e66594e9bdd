//! Durable coordinator metadata
//!
//! One JSON document with three top-level mappings:
//! - files: name → ordered chunk IDs
//! - chunks: chunk ID → replica node IDs
//! - datanodes: node ID → address, last heartbeat
//!
//! Every mutation rewrites the document through a temp file + rename, so a
//! crash never leaves a partially written store behind and a restart replays
//! the last committed state exactly. All maps live behind a single mutex;
//! mutations are serialized globally.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// What to do when a file name is re-registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    Reject,
    Replace,
}

/// Per-node registry entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub address: String,
    pub last_heartbeat: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetaDocument {
    files: BTreeMap<String, Vec<String>>,
    chunks: BTreeMap<String, BTreeSet<String>>,
    datanodes: BTreeMap<String, NodeRecord>,
}

/// Metadata store
pub struct MetadataStore {
    path: PathBuf,
    overwrite: OverwritePolicy,
    inner: Mutex<MetaDocument>,
}

impl MetadataStore {
    /// Open the store, loading the persisted document if present.
    ///
    /// A malformed document is fatal: the store refuses to start rather than
    /// proceed with partially loaded state.
    pub fn open(path: impl AsRef<Path>, overwrite: OverwritePolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = if path.exists() {
            let raw = fs::read(&path)?;
            serde_json::from_slice(&raw)
                .map_err(|e| Error::CorruptMetadata(format!("{}: {}", path.display(), e)))?
        } else {
            MetaDocument::default()
        };

        Ok(Self {
            path,
            overwrite,
            inner: Mutex::new(doc),
        })
    }

    // === File operations ===

    /// Would a registration under this name be accepted?
    pub fn can_register(&self, name: &str) -> Result<()> {
        let doc = self.inner.lock().unwrap();
        if doc.files.contains_key(name) && self.overwrite == OverwritePolicy::Reject {
            return Err(Error::DuplicateFile(name.to_string()));
        }
        Ok(())
    }

    /// Atomically insert the file → chunks mapping.
    ///
    /// All-or-nothing: on persistence failure the in-memory insert is rolled
    /// back, so a partial chunk list is never observable.
    pub fn register_file(&self, name: &str, chunk_ids: Vec<String>) -> Result<()> {
        let mut doc = self.inner.lock().unwrap();
        if doc.files.contains_key(name) && self.overwrite == OverwritePolicy::Reject {
            return Err(Error::DuplicateFile(name.to_string()));
        }

        let previous = doc.files.insert(name.to_string(), chunk_ids);
        if let Err(e) = self.persist(&doc) {
            match previous {
                Some(prev) => doc.files.insert(name.to_string(), prev),
                None => doc.files.remove(name),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Ordered chunk identifiers for a file.
    pub fn get_file_chunks(&self, name: &str) -> Result<Vec<String>> {
        let doc = self.inner.lock().unwrap();
        doc.files
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.inner.lock().unwrap().files.contains_key(name)
    }

    /// Owned snapshot of the file registry.
    pub fn files(&self) -> BTreeMap<String, Vec<String>> {
        self.inner.lock().unwrap().files.clone()
    }

    // === Chunk operations ===

    /// Idempotent set-insertion of a replica holder.
    pub fn add_replica(&self, chunk_id: &str, node_id: &str) -> Result<()> {
        let mut doc = self.inner.lock().unwrap();
        let inserted = doc
            .chunks
            .entry(chunk_id.to_string())
            .or_default()
            .insert(node_id.to_string());

        if !inserted {
            return Ok(());
        }
        if let Err(e) = self.persist(&doc) {
            if let Some(set) = doc.chunks.get_mut(chunk_id) {
                set.remove(node_id);
                if set.is_empty() {
                    doc.chunks.remove(chunk_id);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// The (possibly empty) replica set for a chunk.
    pub fn get_replicas(&self, chunk_id: &str) -> BTreeSet<String> {
        self.inner
            .lock()
            .unwrap()
            .chunks
            .get(chunk_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Owned snapshot of the chunk → replicas mapping.
    pub fn chunk_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.inner.lock().unwrap().chunks.clone()
    }

    /// Recorded replica count per node, for placement.
    pub fn replica_load(&self) -> HashMap<String, usize> {
        let doc = self.inner.lock().unwrap();
        let mut load: HashMap<String, usize> = HashMap::new();
        for replicas in doc.chunks.values() {
            for node in replicas {
                *load.entry(node.clone()).or_insert(0) += 1;
            }
        }
        load
    }

    // === Node operations ===

    /// Register a node or refresh its last-seen timestamp.
    pub fn record_heartbeat(&self, node_id: &str, address: &str, timestamp: u64) -> Result<()> {
        let mut doc = self.inner.lock().unwrap();
        let previous = doc.datanodes.insert(
            node_id.to_string(),
            NodeRecord {
                address: address.to_string(),
                last_heartbeat: timestamp,
            },
        );
        if let Err(e) = self.persist(&doc) {
            match previous {
                Some(prev) => doc.datanodes.insert(node_id.to_string(), prev),
                None => doc.datanodes.remove(node_id),
            };
            return Err(e);
        }
        Ok(())
    }

    pub fn node_record(&self, node_id: &str) -> Option<NodeRecord> {
        self.inner.lock().unwrap().datanodes.get(node_id).cloned()
    }

    /// Owned snapshot of the node registry.
    pub fn node_records(&self) -> BTreeMap<String, NodeRecord> {
        self.inner.lock().unwrap().datanodes.clone()
    }

    // === Persistence ===

    fn persist(&self, doc: &MetaDocument) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            let raw = serde_json::to_vec_pretty(doc)
                .map_err(|e| Error::Internal(format!("serialize metadata: {}", e)))?;
            file.write_all(&raw)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open(dir: &tempfile::TempDir, overwrite: OverwritePolicy) -> MetadataStore {
        MetadataStore::open(dir.path().join("metadata.json"), overwrite).unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let dir = tempdir().unwrap();
        let store = open(&dir, OverwritePolicy::Reject);

        store
            .register_file("a.txt", vec!["c1".into(), "c2".into()])
            .unwrap();
        assert_eq!(store.get_file_chunks("a.txt").unwrap(), vec!["c1", "c2"]);
        assert!(store.file_exists("a.txt"));
    }

    #[test]
    fn test_unknown_file_not_found() {
        let dir = tempdir().unwrap();
        let store = open(&dir, OverwritePolicy::Reject);
        assert!(matches!(
            store.get_file_chunks("missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        let dir = tempdir().unwrap();
        let store = open(&dir, OverwritePolicy::Reject);

        store.register_file("a.txt", vec!["c1".into()]).unwrap();
        assert!(matches!(store.can_register("a.txt"), Err(Error::DuplicateFile(_))));
        assert!(matches!(
            store.register_file("a.txt", vec!["c2".into()]),
            Err(Error::DuplicateFile(_))
        ));
        // original mapping untouched
        assert_eq!(store.get_file_chunks("a.txt").unwrap(), vec!["c1"]);
    }

    #[test]
    fn test_overwrite_replaces_atomically() {
        let dir = tempdir().unwrap();
        let store = open(&dir, OverwritePolicy::Replace);

        store.register_file("a.txt", vec!["c1".into()]).unwrap();
        store.register_file("a.txt", vec!["c2".into(), "c3".into()]).unwrap();
        assert_eq!(store.get_file_chunks("a.txt").unwrap(), vec!["c2", "c3"]);
    }

    #[test]
    fn test_add_replica_idempotent() {
        let dir = tempdir().unwrap();
        let store = open(&dir, OverwritePolicy::Reject);

        store.add_replica("c1", "d0").unwrap();
        store.add_replica("c1", "d1").unwrap();
        store.add_replica("c1", "d0").unwrap();

        let replicas = store.get_replicas("c1");
        assert_eq!(replicas.len(), 2);
        assert!(replicas.contains("d0") && replicas.contains("d1"));

        // unknown chunk → empty set, not an error
        assert!(store.get_replicas("nope").is_empty());
    }

    #[test]
    fn test_replica_load() {
        let dir = tempdir().unwrap();
        let store = open(&dir, OverwritePolicy::Reject);

        store.add_replica("c1", "d0").unwrap();
        store.add_replica("c2", "d0").unwrap();
        store.add_replica("c2", "d1").unwrap();

        let load = store.replica_load();
        assert_eq!(load.get("d0"), Some(&2));
        assert_eq!(load.get("d1"), Some(&1));
        assert_eq!(load.get("d2"), None);
    }

    #[test]
    fn test_reload_reconstructs_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");

        {
            let store = MetadataStore::open(&path, OverwritePolicy::Reject).unwrap();
            store.register_file("a.txt", vec!["c1".into(), "c2".into()]).unwrap();
            store.add_replica("c1", "d0").unwrap();
            store.add_replica("c2", "d1").unwrap();
            store.record_heartbeat("d0", "127.0.0.1:7001", 1234).unwrap();
        }

        // reopen and verify identical state
        let store = MetadataStore::open(&path, OverwritePolicy::Reject).unwrap();
        assert_eq!(store.get_file_chunks("a.txt").unwrap(), vec!["c1", "c2"]);
        assert!(store.get_replicas("c1").contains("d0"));
        assert!(store.get_replicas("c2").contains("d1"));
        let rec = store.node_record("d0").unwrap();
        assert_eq!(rec.address, "127.0.0.1:7001");
        assert_eq!(rec.last_heartbeat, 1234);
    }

    #[test]
    fn test_corrupt_document_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, b"{ this is not json").unwrap();

        assert!(matches!(
            MetadataStore::open(&path, OverwritePolicy::Reject),
            Err(Error::CorruptMetadata(_))
        ));
    }

    #[test]
    fn test_document_is_inspectable_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let store = MetadataStore::open(&path, OverwritePolicy::Reject).unwrap();
        store.register_file("a.txt", vec!["c1".into()]).unwrap();
        store.add_replica("c1", "d0").unwrap();
        store.record_heartbeat("d0", "127.0.0.1:7001", 99).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(doc.get("files").is_some());
        assert!(doc.get("chunks").is_some());
        assert!(doc.get("datanodes").is_some());
    }
}

//! Ordered chunk retrieval with replica failover
//!
//! For every chunk the recorded replica set is intersected with the alive
//! set; candidates are tried in ascending node-id order with a timeout per
//! attempt. A chunk with no reachable replica aborts the whole download;
//! a partially reconstructed file is never returned.

use crate::common::{timestamp_now, Error, Result};
use crate::coordinator::heartbeat::HeartbeatMonitor;
use crate::coordinator::metadata::MetadataStore;
use crate::coordinator::transport::ChunkTransport;
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use std::time::Duration;

/// Reassembly engine
pub struct ReassemblyEngine<T> {
    store: Arc<MetadataStore>,
    monitor: Arc<HeartbeatMonitor>,
    transport: Arc<T>,
    attempt_timeout: Duration,
}

impl<T: ChunkTransport> ReassemblyEngine<T> {
    pub fn new(
        store: Arc<MetadataStore>,
        monitor: Arc<HeartbeatMonitor>,
        transport: Arc<T>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            store,
            monitor,
            transport,
            attempt_timeout,
        }
    }

    /// Reconstruct a file, concatenating chunks in original order.
    pub async fn download(&self, name: &str) -> Result<Bytes> {
        let chunk_ids = self.store.get_file_chunks(name)?;

        let mut assembled = BytesMut::new();
        for chunk_id in &chunk_ids {
            let data = self.fetch_one(chunk_id).await?;
            assembled.extend_from_slice(&data);
        }

        tracing::info!(
            file = name,
            chunks = chunk_ids.len(),
            bytes = assembled.len(),
            "download reassembled"
        );
        Ok(assembled.freeze())
    }

    async fn fetch_one(&self, chunk_id: &str) -> Result<Bytes> {
        let now = timestamp_now();
        // BTreeSet order makes the candidate walk deterministic
        let candidates: Vec<String> = self
            .store
            .get_replicas(chunk_id)
            .into_iter()
            .filter(|node| self.monitor.is_alive(node, now))
            .collect();

        if candidates.is_empty() {
            return Err(Error::Unavailable(chunk_id.to_string()));
        }

        for node_id in &candidates {
            let Some(record) = self.store.node_record(node_id) else {
                continue;
            };
            match tokio::time::timeout(
                self.attempt_timeout,
                self.transport.fetch_chunk(&record.address, chunk_id),
            )
            .await
            {
                Ok(Ok(data)) => return Ok(data),
                Ok(Err(e)) => {
                    tracing::warn!(chunk_id, node_id = %node_id, "chunk fetch failed: {}", e);
                }
                Err(_) => {
                    tracing::warn!(chunk_id, node_id = %node_id, "chunk fetch timed out");
                }
            }
        }

        Err(Error::Unavailable(chunk_id.to_string()))
    }
}

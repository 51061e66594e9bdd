//! Upload orchestration
//!
//! Per chunk: placement against the currently alive set, transfer to each
//! target with bounded retries and a timeout per attempt, and a replica
//! record for every confirmed copy. The file is registered only once every
//! chunk has at least one confirmed replica; otherwise the whole upload
//! aborts and the name never becomes visible.

use crate::common::{retry_with_backoff, timestamp_now, Error, Result};
use crate::coordinator::heartbeat::HeartbeatMonitor;
use crate::coordinator::metadata::MetadataStore;
use crate::coordinator::placement::PlacementEngine;
use crate::coordinator::transport::ChunkTransport;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(200);

/// Upload coordinator
pub struct UploadCoordinator<T> {
    store: Arc<MetadataStore>,
    monitor: Arc<HeartbeatMonitor>,
    placement: Arc<PlacementEngine>,
    transport: Arc<T>,
    replication: usize,
    retries: usize,
    attempt_timeout: Duration,
}

impl<T: ChunkTransport> UploadCoordinator<T> {
    pub fn new(
        store: Arc<MetadataStore>,
        monitor: Arc<HeartbeatMonitor>,
        placement: Arc<PlacementEngine>,
        transport: Arc<T>,
        replication: usize,
        retries: usize,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            store,
            monitor,
            placement,
            transport,
            replication,
            retries,
            attempt_timeout,
        }
    }

    /// Place and transfer every chunk, then register the file.
    pub async fn ingest(&self, name: &str, chunks: Vec<(String, Bytes)>) -> Result<()> {
        self.store.can_register(name)?;

        let total = chunks.len();
        let mut chunk_ids = Vec::with_capacity(total);

        for (index, (chunk_id, data)) in chunks.into_iter().enumerate() {
            let alive = self.monitor.list_alive(timestamp_now());
            let targets = self
                .placement
                .choose_replicas(&chunk_id, self.replication, &alive);
            if targets.is_empty() {
                tracing::error!(file = name, %chunk_id, "no alive datanodes, aborting upload");
                return Err(Error::PlacementFailed(chunk_id));
            }
            if targets.len() < self.replication {
                tracing::warn!(
                    %chunk_id,
                    placed = targets.len(),
                    wanted = self.replication,
                    "placing below target replication"
                );
            }

            let mut confirmed = 0;
            for node_id in &targets {
                let Some(record) = self.store.node_record(node_id) else {
                    continue;
                };
                match self.send_with_retry(&record.address, &chunk_id, &data).await {
                    Ok(()) => {
                        self.store.add_replica(&chunk_id, node_id)?;
                        confirmed += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            %chunk_id,
                            node_id = %node_id,
                            "chunk transfer failed: {}",
                            e
                        );
                    }
                }
            }

            if confirmed == 0 {
                tracing::error!(file = name, %chunk_id, "chunk has no confirmed replica, aborting upload");
                return Err(Error::TransferFailed(chunk_id));
            }

            tracing::debug!(
                file = name,
                chunk = index + 1,
                of = total,
                replicas = confirmed,
                "chunk placed"
            );
            chunk_ids.push(chunk_id);
        }

        self.store.register_file(name, chunk_ids)?;
        tracing::info!(file = name, chunks = total, "upload committed");
        Ok(())
    }

    async fn send_with_retry(&self, address: &str, chunk_id: &str, data: &Bytes) -> Result<()> {
        let attempt_timeout = self.attempt_timeout;
        retry_with_backoff(
            move || {
                let send = self.transport.send_chunk(address, chunk_id, data);
                async move {
                    tokio::time::timeout(attempt_timeout, send)
                        .await
                        .map_err(|_| {
                            Error::Timeout(format!("send chunk {} to {}", chunk_id, address))
                        })?
                }
            },
            self.retries,
            RETRY_INITIAL_DELAY,
        )
        .await
    }
}

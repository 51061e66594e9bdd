//! Datanode server: heartbeats out, chunk operations in

use crate::common::wire::{read_frame, write_frame, Request, Response};
use crate::common::{timestamp_now, DatanodeConfig, Result};
use crate::datanode::store::ChunkStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

pub struct DatanodeServer {
    config: DatanodeConfig,
}

impl DatanodeServer {
    pub fn new(config: DatanodeConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting datanode: {}", self.config.node_id);
        tracing::info!("  Chunk service: {}", self.config.bind_addr);
        tracing::info!("  Data dir: {}", self.config.data_dir.display());
        tracing::info!("  Coordinator: {}", self.config.coordinator_addr);

        let store = Arc::new(ChunkStore::open(&self.config.data_dir)?);
        let listener = TcpListener::bind(self.config.bind_addr).await?;

        tokio::spawn(run_heartbeat(self.config.clone()));

        tracing::info!("✓ Datanode ready");
        run_listener(listener, store).await;
        Ok(())
    }
}

/// Accept chunk-service connections, one task each.
pub async fn run_listener(listener: TcpListener, store: Arc<ChunkStore>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, &store).await {
                        tracing::warn!("connection from {} failed: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                tracing::warn!("accept error: {}", e);
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, store: &ChunkStore) -> Result<()> {
    let (req, payload) = read_frame::<_, Request>(&mut stream).await?;

    match req {
        Request::Store { chunk_id, checksum } => {
            let actual = blake3::hash(&payload).to_string();
            if actual != checksum {
                tracing::warn!(%chunk_id, "rejecting corrupted chunk payload");
                let resp = Response::Error {
                    message: format!("checksum mismatch: expected {}, got {}", checksum, actual),
                };
                return write_frame(&mut stream, &resp, &[]).await;
            }

            match store.save(&chunk_id, &payload) {
                Ok(()) => {
                    tracing::debug!(%chunk_id, bytes = payload.len(), "chunk stored");
                    write_frame(&mut stream, &Response::Ok { checksum: None }, &[]).await
                }
                Err(e) => {
                    tracing::error!(%chunk_id, "chunk store failed: {}", e);
                    let resp = Response::Error {
                        message: e.to_string(),
                    };
                    write_frame(&mut stream, &resp, &[]).await
                }
            }
        }
        Request::Retrieve { chunk_id } => match store.load(&chunk_id)? {
            Some(data) => {
                tracing::debug!(%chunk_id, bytes = data.len(), "chunk served");
                let resp = Response::Ok {
                    checksum: Some(blake3::hash(&data).to_string()),
                };
                write_frame(&mut stream, &resp, &data).await
            }
            None => write_frame(&mut stream, &Response::NotFound, &[]).await,
        },
        Request::Heartbeat { .. } => {
            let resp = Response::Error {
                message: "heartbeats go to the coordinator".to_string(),
            };
            write_frame(&mut stream, &resp, &[]).await
        }
    }
}

/// Periodic heartbeat sender; transient failures are logged and retried
/// on the next tick.
pub async fn run_heartbeat(config: DatanodeConfig) {
    let mut ticker = tokio::time::interval(config.heartbeat_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if let Err(e) = send_heartbeat(
            &config.coordinator_addr,
            &config.node_id,
            &config.advertise_addr,
        )
        .await
        {
            tracing::warn!("heartbeat to {} failed: {}", config.coordinator_addr, e);
        }
    }
}

/// Send one heartbeat message to the coordinator.
pub async fn send_heartbeat(coordinator_addr: &str, node_id: &str, advertise_addr: &str) -> Result<()> {
    let connect = TcpStream::connect(coordinator_addr);
    let mut stream = tokio::time::timeout(Duration::from_secs(5), connect)
        .await
        .map_err(|_| crate::Error::Timeout(format!("heartbeat connect to {}", coordinator_addr)))??;

    let msg = Request::Heartbeat {
        node_id: node_id.to_string(),
        address: advertise_addr.to_string(),
        timestamp: timestamp_now(),
    };
    write_frame(&mut stream, &msg, &[]).await
}

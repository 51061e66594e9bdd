//! Coordinator server

use crate::common::{CoordinatorConfig, Result};
use crate::coordinator::heartbeat::{self, HeartbeatMonitor};
use crate::coordinator::http::{create_router, CoordState};
use crate::coordinator::metadata::{MetadataStore, OverwritePolicy};
use crate::coordinator::placement::PlacementEngine;
use crate::coordinator::reassembly::ReassemblyEngine;
use crate::coordinator::transport::TcpTransport;
use crate::coordinator::upload::UploadCoordinator;
use std::sync::Arc;

pub struct Coordinator {
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    pub async fn serve(self) -> Result<()> {
        self.config.validate()?;

        tracing::info!("Starting coordinator");
        tracing::info!("  HTTP API: {}", self.config.bind_addr);
        tracing::info!("  Heartbeats: {}", self.config.heartbeat_addr);
        tracing::info!("  Metadata: {}", self.config.meta_path.display());
        tracing::info!("  Replication: {}", self.config.replication);

        let overwrite = if self.config.overwrite_files {
            OverwritePolicy::Replace
        } else {
            OverwritePolicy::Reject
        };
        let store = Arc::new(MetadataStore::open(&self.config.meta_path, overwrite)?);
        let monitor = Arc::new(HeartbeatMonitor::new(
            store.clone(),
            self.config.heartbeat_timeout_secs,
        ));
        let placement = Arc::new(PlacementEngine::new(store.clone()));
        let transport = Arc::new(TcpTransport::new());

        let upload = Arc::new(UploadCoordinator::new(
            store.clone(),
            monitor.clone(),
            placement,
            transport.clone(),
            self.config.replication,
            self.config.transfer_retries,
            self.config.transfer_timeout(),
        ));
        let reassembly = Arc::new(ReassemblyEngine::new(
            store.clone(),
            monitor.clone(),
            transport,
            self.config.transfer_timeout(),
        ));

        // Heartbeat listener + liveness sweep
        let hb_listener = tokio::net::TcpListener::bind(self.config.heartbeat_addr).await?;
        tokio::spawn(heartbeat::run_listener(hb_listener, monitor.clone()));
        tokio::spawn(heartbeat::run_sweep(
            monitor.clone(),
            self.config.heartbeat_interval(),
        ));

        let state = CoordState {
            store,
            monitor,
            upload,
            reassembly,
            chunk_size: self.config.chunk_size,
        };
        let router = create_router(state, self.config.max_upload_bytes);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!("✓ Coordinator ready");
        axum::serve(listener, router).await?;

        Ok(())
    }
}

//! HTTP API for the coordinator
//!
//! Every route maps onto one core operation: upload, download, and the
//! file/chunk/node listings. Bodies are raw bytes for upload/download and
//! JSON everywhere else.

use crate::common::{chunker, format_bytes, validate_file_name, Error};
use crate::coordinator::heartbeat::HeartbeatMonitor;
use crate::coordinator::metadata::MetadataStore;
use crate::coordinator::reassembly::ReassemblyEngine;
use crate::coordinator::transport::ChunkTransport;
use crate::coordinator::upload::UploadCoordinator;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared coordinator state for HTTP handlers.
pub struct CoordState<T> {
    pub store: Arc<MetadataStore>,
    pub monitor: Arc<HeartbeatMonitor>,
    pub upload: Arc<UploadCoordinator<T>>,
    pub reassembly: Arc<ReassemblyEngine<T>>,
    pub chunk_size: usize,
}

impl<T> Clone for CoordState<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            monitor: self.monitor.clone(),
            upload: self.upload.clone(),
            reassembly: self.reassembly.clone(),
            chunk_size: self.chunk_size,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.to_http_status();
        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Creates the HTTP router with all public endpoints.
pub fn create_router<T>(state: CoordState<T>, max_upload_bytes: usize) -> Router
where
    T: ChunkTransport + 'static,
{
    Router::new()
        .route("/files", get(list_files::<T>))
        .route(
            "/files/:name",
            get(download_file::<T>).post(upload_file::<T>),
        )
        .route("/chunks", get(list_chunks::<T>))
        .route("/nodes", get(list_nodes::<T>))
        .route("/health", get(health::<T>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Split the body into chunks and drive the upload.
async fn upload_file<T: ChunkTransport>(
    State(state): State<CoordState<T>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    validate_file_name(&name)?;

    let size = body.len();
    let chunks = chunker::split(&body, state.chunk_size);
    let chunk_count = chunks.len();
    tracing::info!(
        file = %name,
        size = %format_bytes(size as u64),
        chunks = chunk_count,
        "upload started"
    );

    state.upload.ingest(&name, chunks).await?;

    Ok((
        StatusCode::CREATED,
        axum::Json(json!({
            "file": name,
            "size": size,
            "chunks": chunk_count,
        })),
    ))
}

/// Reassemble and return the file bytes.
async fn download_file<T: ChunkTransport>(
    State(state): State<CoordState<T>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let data = state.reassembly.download(&name).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data,
    ))
}

async fn list_files<T: ChunkTransport>(
    State(state): State<CoordState<T>>,
) -> impl IntoResponse {
    let files: Vec<_> = state
        .store
        .files()
        .into_iter()
        .map(|(name, chunks)| json!({ "name": name, "chunks": chunks.len() }))
        .collect();
    axum::Json(json!({ "files": files }))
}

async fn list_chunks<T: ChunkTransport>(
    State(state): State<CoordState<T>>,
) -> impl IntoResponse {
    axum::Json(json!({ "chunks": state.store.chunk_map() }))
}

async fn list_nodes<T: ChunkTransport>(
    State(state): State<CoordState<T>>,
) -> impl IntoResponse {
    let now = crate::common::timestamp_now();
    let nodes: Vec<_> = state
        .monitor
        .statuses(now)
        .into_iter()
        .map(|s| {
            let last_seen = chrono::DateTime::from_timestamp(s.last_heartbeat as i64, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            json!({
                "node_id": s.node_id,
                "address": s.address,
                "state": s.state,
                "last_heartbeat": last_seen,
            })
        })
        .collect();
    axum::Json(json!({ "nodes": nodes }))
}

async fn health<T: ChunkTransport>(State(state): State<CoordState<T>>) -> impl IntoResponse {
    let now = crate::common::timestamp_now();
    let alive = state.monitor.list_alive(now).len();
    axum::Json(json!({
        "status": "healthy",
        "version": crate::VERSION,
        "datanodes_alive": alive,
    }))
}

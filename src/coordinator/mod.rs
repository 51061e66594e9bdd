//! Coordinator implementation
//!
//! The coordinator is responsible for:
//! - Metadata management (file → chunks, chunk → replicas, node registry)
//! - Heartbeat tracking and derived liveness
//! - Placement decisions (least-loaded, deterministic)
//! - Upload and download orchestration
//! - The public HTTP API

pub mod heartbeat;
pub mod http;
pub mod metadata;
pub mod placement;
pub mod reassembly;
pub mod server;
pub mod transport;
pub mod upload;

pub use server::Coordinator;

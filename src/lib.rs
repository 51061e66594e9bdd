//! # minidfs
//!
//! A miniature distributed file store:
//! - Files split into fixed-size chunks (2 MB by default)
//! - Each chunk replicated across several datanodes
//! - Heartbeat-derived liveness drives placement and read failover
//! - Coordinator metadata persisted as one human-inspectable JSON document
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Coordinator                │
//! │  - file → chunks, chunk → replicas      │
//! │  - heartbeat tracking, placement        │
//! │  - HTTP API (upload/download/listings)  │
//! └───────────┬─────────────────────────────┘
//!             │ framed TCP (STORE / RETRIEVE / HEARTBEAT)
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼──────────┐   ┌─────▼──────┐   ┌──▼───────────┐
//! │ Datanode 0 │   │ Datanode 1 │   │ Datanode 2   │
//! │ chunk dir  │   │ chunk dir  │   │ chunk dir    │
//! └────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start the coordinator
//! ```bash
//! minidfs-coord serve \
//!   --bind 0.0.0.0:5000 \
//!   --heartbeat-bind 0.0.0.0:6000 \
//!   --meta ./metadata.json
//! ```
//!
//! ### Start a datanode
//! ```bash
//! minidfs-datanode serve \
//!   --id d0 \
//!   --bind 0.0.0.0:7001 \
//!   --data ./storage/d0 \
//!   --coordinator 127.0.0.1:6000
//! ```
//!
//! ### Use the CLI
//! ```bash
//! minidfs upload ./report.pdf --coordinator http://localhost:5000
//! minidfs download report.pdf --output ./report.pdf
//! minidfs files
//! minidfs nodes
//! ```

pub mod common;
pub mod coordinator;
pub mod datanode;

// Re-export commonly used types
pub use common::{CoordinatorConfig, DatanodeConfig, Error, Result};
pub use coordinator::Coordinator;
pub use datanode::DatanodeServer;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

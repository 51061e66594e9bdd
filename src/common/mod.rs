//! Common utilities and types shared across minidfs

pub mod chunker;
pub mod config;
pub mod error;
pub mod utils;
pub mod wire;

pub use config::{CoordinatorConfig, DatanodeConfig, DEFAULT_CHUNK_SIZE};
pub use error::{Error, Result};
pub use utils::{encode_file_name, format_bytes, retry_with_backoff, timestamp_now, validate_file_name, NodeState};

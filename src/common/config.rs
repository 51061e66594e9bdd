//! Configuration for minidfs components

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default chunk size: 2 MB
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Bind address for the HTTP API
    pub bind_addr: SocketAddr,

    /// Bind address for the TCP heartbeat listener
    pub heartbeat_addr: SocketAddr,

    /// Path of the persisted metadata document
    pub meta_path: PathBuf,

    /// Target replicas per chunk
    #[serde(default = "default_replication")]
    pub replication: usize,

    /// Chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Expected heartbeat interval (seconds)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Seconds without a heartbeat before a node counts as dead
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,

    /// Timeout per chunk send/fetch attempt (seconds)
    #[serde(default = "default_transfer_timeout")]
    pub transfer_timeout_secs: u64,

    /// Send attempts per datanode before giving up on it
    #[serde(default = "default_transfer_retries")]
    pub transfer_retries: usize,

    /// Replace an existing file on re-upload instead of rejecting it
    #[serde(default)]
    pub overwrite_files: bool,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

fn default_replication() -> usize {
    2
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_heartbeat_interval() -> u64 {
    5
}
fn default_heartbeat_timeout() -> u64 {
    10
}
fn default_transfer_timeout() -> u64 {
    30
}
fn default_transfer_retries() -> usize {
    3
}
fn default_max_upload() -> usize {
    512 * 1024 * 1024
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".parse().unwrap(),
            heartbeat_addr: "0.0.0.0:6000".parse().unwrap(),
            meta_path: PathBuf::from("./metadata.json"),
            replication: default_replication(),
            chunk_size: default_chunk_size(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            heartbeat_timeout_secs: default_heartbeat_timeout(),
            transfer_timeout_secs: default_transfer_timeout(),
            transfer_retries: default_transfer_retries(),
            overwrite_files: false,
            max_upload_bytes: default_max_upload(),
        }
    }
}

impl CoordinatorConfig {
    /// Load from a TOML file, with `MINIDFS_*` environment overrides.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("MINIDFS").separator("__"))
            .build()
            .map_err(|e| crate::Error::InvalidConfig(e.to_string()))?;
        cfg.try_deserialize()
            .map_err(|e| crate::Error::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.replication == 0 {
            return Err(crate::Error::InvalidConfig(
                "replication must be at least 1".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(crate::Error::InvalidConfig("chunk_size must be non-zero".into()));
        }
        if self.transfer_retries == 0 {
            return Err(crate::Error::InvalidConfig(
                "transfer_retries must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}

/// Datanode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatanodeConfig {
    /// Node ID (unique identifier)
    pub node_id: String,

    /// Bind address for the chunk service
    pub bind_addr: SocketAddr,

    /// Address other nodes should use to reach the chunk service
    pub advertise_addr: String,

    /// Directory holding chunk files
    pub data_dir: PathBuf,

    /// Coordinator heartbeat endpoint (host:port)
    pub coordinator_addr: String,

    /// Heartbeat interval (seconds)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

impl DatanodeConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CoordinatorConfig::default();
        assert_eq!(cfg.replication, 2);
        assert_eq!(cfg.chunk_size, 2 * 1024 * 1024);
        assert_eq!(cfg.heartbeat_timeout_secs, 2 * cfg.heartbeat_interval_secs);
        assert!(!cfg.overwrite_files);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_replication() {
        let cfg = CoordinatorConfig {
            replication: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coord.toml");
        std::fs::write(
            &path,
            r#"
bind_addr = "127.0.0.1:5500"
heartbeat_addr = "127.0.0.1:6600"
meta_path = "/tmp/meta.json"
replication = 3
"#,
        )
        .unwrap();

        let cfg = CoordinatorConfig::load(&path).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:5500".parse().unwrap());
        assert_eq!(cfg.replication, 3);
        // untouched fields keep their defaults
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
    }
}

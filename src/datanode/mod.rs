//! Datanode implementation
//!
//! A datanode stores chunk bytes on disk, serves STORE/RETRIEVE requests
//! from the coordinator, and reports liveness through periodic heartbeats.

pub mod server;
pub mod store;

pub use server::DatanodeServer;
pub use store::ChunkStore;

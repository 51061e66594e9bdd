//! Client side of the chunk transfer protocol
//!
//! `ChunkTransport` is the seam between the coordinator's orchestration
//! logic and the datanode wire protocol; tests substitute an in-memory
//! implementation. `TcpTransport` speaks the framed protocol and verifies
//! BLAKE3 checksums in both directions.

use crate::common::wire::{read_frame, write_frame, Request, Response};
use crate::common::{Error, Result};
use bytes::Bytes;
use std::future::Future;
use tokio::net::TcpStream;

/// Chunk send/fetch against a datanode address.
pub trait ChunkTransport: Send + Sync {
    fn send_chunk(
        &self,
        address: &str,
        chunk_id: &str,
        data: &Bytes,
    ) -> impl Future<Output = Result<()>> + Send;

    fn fetch_chunk(
        &self,
        address: &str,
        chunk_id: &str,
    ) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Framed-TCP transport
#[derive(Debug, Default, Clone)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }

    async fn connect(address: &str) -> Result<TcpStream> {
        TcpStream::connect(address)
            .await
            .map_err(|e| Error::ConnectionFailed(format!("{}: {}", address, e)))
    }
}

impl ChunkTransport for TcpTransport {
    async fn send_chunk(&self, address: &str, chunk_id: &str, data: &Bytes) -> Result<()> {
        let mut stream = Self::connect(address).await?;

        let checksum = blake3::hash(data).to_string();
        let req = Request::Store {
            chunk_id: chunk_id.to_string(),
            checksum,
        };
        write_frame(&mut stream, &req, data).await?;

        let (resp, _) = read_frame::<_, Response>(&mut stream).await?;
        match resp {
            Response::Ok { .. } => Ok(()),
            Response::NotFound => Err(Error::Protocol(format!(
                "unexpected NOT_FOUND storing chunk {}",
                chunk_id
            ))),
            Response::Error { message } => Err(Error::Internal(format!(
                "datanode {} rejected chunk {}: {}",
                address, chunk_id, message
            ))),
        }
    }

    async fn fetch_chunk(&self, address: &str, chunk_id: &str) -> Result<Bytes> {
        let mut stream = Self::connect(address).await?;

        let req = Request::Retrieve {
            chunk_id: chunk_id.to_string(),
        };
        write_frame(&mut stream, &req, &[]).await?;

        let (resp, payload) = read_frame::<_, Response>(&mut stream).await?;
        match resp {
            Response::Ok { checksum } => {
                if let Some(expected) = checksum {
                    let actual = blake3::hash(&payload).to_string();
                    if actual != expected {
                        return Err(Error::ChecksumMismatch { expected, actual });
                    }
                }
                Ok(payload)
            }
            Response::NotFound => Err(Error::NotFound(chunk_id.to_string())),
            Response::Error { message } => Err(Error::Internal(format!(
                "datanode {} failed chunk {}: {}",
                address, chunk_id, message
            ))),
        }
    }
}

//! Framed TCP protocol between the coordinator and datanodes
//!
//! Each frame is a JSON header followed by a binary payload, both prefixed
//! with a big-endian u64 length:
//!
//! ```text
//! [hdr_len: u64][hdr: JSON][payload_len: u64][payload]
//! ```
//!
//! Requests carry a `cmd` tag (STORE, RETRIEVE, HEARTBEAT), responses a
//! `status` tag (OK, NOT_FOUND, ERROR). STORE requests and OK responses to
//! RETRIEVE carry a BLAKE3 checksum of the payload.

use crate::common::{Error, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Headers are small JSON objects
const MAX_HEADER_BYTES: u64 = 64 * 1024;
/// Payloads are single chunks, bounded well above any sane chunk size
const MAX_PAYLOAD_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    Store { chunk_id: String, checksum: String },
    Retrieve { chunk_id: String },
    Heartbeat { node_id: String, address: String, timestamp: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checksum: Option<String>,
    },
    NotFound,
    Error {
        message: String,
    },
}

/// Write one frame: header then payload.
pub async fn write_frame<W, T>(writer: &mut W, header: &T, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let hdr = serde_json::to_vec(header).map_err(|e| Error::Protocol(e.to_string()))?;
    writer.write_all(&(hdr.len() as u64).to_be_bytes()).await?;
    writer.write_all(&hdr).await?;
    writer
        .write_all(&(payload.len() as u64).to_be_bytes())
        .await?;
    if !payload.is_empty() {
        writer.write_all(payload).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Read one frame: header then payload.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<(T, Bytes)>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let hdr_len = read_len(reader, MAX_HEADER_BYTES, "header").await?;
    let mut hdr = vec![0u8; hdr_len as usize];
    reader.read_exact(&mut hdr).await?;
    let header: T =
        serde_json::from_slice(&hdr).map_err(|e| Error::Protocol(format!("bad header: {}", e)))?;

    let payload_len = read_len(reader, MAX_PAYLOAD_BYTES, "payload").await?;
    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 {
        reader.read_exact(&mut payload).await?;
    }

    Ok((header, Bytes::from(payload)))
}

async fn read_len<R: AsyncRead + Unpin>(reader: &mut R, max: u64, what: &str) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).await?;
    let len = u64::from_be_bytes(buf);
    if len > max {
        return Err(Error::Protocol(format!(
            "{} length {} exceeds limit {}",
            what, len, max
        )));
    }
    Ok(len)
}

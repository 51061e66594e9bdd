//! On-disk chunk storage
//!
//! One file per chunk, named by chunk id, written through a temp file +
//! rename. Chunk ids are validated before any path use.

use crate::common::{Error, Result};
use bytes::Bytes;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Chunk store rooted at a data directory
pub struct ChunkStore {
    dir: PathBuf,
}

impl ChunkStore {
    /// Open or create the data directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Persist one chunk. Overwrites an existing copy of the same id.
    pub fn save(&self, chunk_id: &str, data: &[u8]) -> Result<()> {
        validate_chunk_id(chunk_id)?;

        let path = self.dir.join(chunk_id);
        let tmp = self.dir.join(format!("{}.tmp", chunk_id));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Load one chunk, `None` if this node never stored it.
    pub fn load(&self, chunk_id: &str) -> Result<Option<Bytes>> {
        validate_chunk_id(chunk_id)?;

        let path = self.dir.join(chunk_id);
        match fs::read(&path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Chunk ids are UUIDs; anything else never touches the filesystem.
fn validate_chunk_id(chunk_id: &str) -> Result<()> {
    let ok = !chunk_id.is_empty()
        && chunk_id.len() <= 64
        && chunk_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(Error::Protocol(format!("invalid chunk id: {:?}", chunk_id)))
    }
}

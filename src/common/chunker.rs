//! File splitting: fixed-size chunks with generated identifiers
//!
//! The last chunk may be shorter than the chunk size. An empty input
//! yields no chunks.

use bytes::Bytes;
use uuid::Uuid;

/// Split file bytes into an ordered sequence of `(chunk_id, bytes)` pairs.
pub fn split(data: &[u8], chunk_size: usize) -> Vec<(String, Bytes)> {
    data.chunks(chunk_size)
        .map(|slice| (Uuid::new_v4().to_string(), Bytes::copy_from_slice(slice)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes_and_order() {
        let data: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();
        let chunks = split(&data, 4096);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].1.len(), 4096);
        assert_eq!(chunks[1].1.len(), 4096);
        assert_eq!(chunks[2].1.len(), 10_000 - 2 * 4096);

        // concatenating in order reproduces the input
        let joined: Vec<u8> = chunks.iter().flat_map(|(_, b)| b.to_vec()).collect();
        assert_eq!(joined, data);
    }

    #[test]
    fn test_split_exact_multiple() {
        let data = vec![7u8; 8192];
        let chunks = split(&data, 4096);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|(_, b)| b.len() == 4096));
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split(&[], 4096).is_empty());
    }

    #[test]
    fn test_chunk_ids_unique() {
        let data = vec![0u8; 64 * 1024];
        let ids: HashSet<String> = split(&data, 1024).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids.len(), 64);
    }
}

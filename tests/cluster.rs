//! End-to-end tests over real datanode listeners and the framed protocol

use bytes::Bytes;
use minidfs::common::wire::{read_frame, write_frame, Request, Response};
use minidfs::common::{chunker, timestamp_now, Error};
use minidfs::coordinator::heartbeat::{self, HeartbeatMonitor};
use minidfs::coordinator::metadata::{MetadataStore, OverwritePolicy};
use minidfs::coordinator::placement::PlacementEngine;
use minidfs::coordinator::reassembly::ReassemblyEngine;
use minidfs::coordinator::transport::{ChunkTransport, TcpTransport};
use minidfs::coordinator::upload::UploadCoordinator;
use minidfs::datanode::{server as datanode, ChunkStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const CHUNK_SIZE: usize = 2 * 1024 * 1024;

struct Cluster {
    _dir: TempDir,
    store: Arc<MetadataStore>,
    monitor: Arc<HeartbeatMonitor>,
    upload: UploadCoordinator<TcpTransport>,
    reassembly: ReassemblyEngine<TcpTransport>,
}

/// Spin up one datanode listener on an ephemeral port, returning its address.
async fn start_datanode(dir: &TempDir, id: &str) -> String {
    let store = Arc::new(ChunkStore::open(dir.path().join(id)).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(datanode::run_listener(listener, store));
    addr
}

/// Coordinator state plus `node_ids` running datanodes, all heartbeating now.
async fn cluster(node_ids: &[&str]) -> Cluster {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        MetadataStore::open(dir.path().join("metadata.json"), OverwritePolicy::Reject).unwrap(),
    );
    let monitor = Arc::new(HeartbeatMonitor::new(store.clone(), 10));
    let placement = Arc::new(PlacementEngine::new(store.clone()));
    let transport = Arc::new(TcpTransport::new());

    for id in node_ids {
        let addr = start_datanode(&dir, id).await;
        monitor.record(id, &addr, timestamp_now()).unwrap();
    }

    let upload = UploadCoordinator::new(
        store.clone(),
        monitor.clone(),
        placement,
        transport.clone(),
        2,
        2,
        Duration::from_secs(5),
    );
    let reassembly = ReassemblyEngine::new(
        store.clone(),
        monitor.clone(),
        transport,
        Duration::from_secs(5),
    );

    Cluster {
        _dir: dir,
        store,
        monitor,
        upload,
        reassembly,
    }
}

fn test_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_round_trip_and_failover() {
    let cluster = cluster(&["d0", "d1"]).await;

    // 5 MB with 2 MB chunks → 3 chunks, each replicated to both nodes
    let data = test_payload(5 * 1024 * 1024);
    let chunks = chunker::split(&data, CHUNK_SIZE);
    cluster.upload.ingest("big.bin", chunks).await.unwrap();

    let chunk_ids = cluster.store.get_file_chunks("big.bin").unwrap();
    assert_eq!(chunk_ids.len(), 3);
    for chunk_id in &chunk_ids {
        let replicas = cluster.store.get_replicas(chunk_id);
        assert!(replicas.contains("d0") && replicas.contains("d1"));
    }

    let fetched = cluster.reassembly.download("big.bin").await.unwrap();
    assert_eq!(&fetched[..], &data[..]);

    // d1 stops heartbeating past the timeout: excluded from the alive set,
    // replica records untouched, download survives on d0 alone
    let d1_addr = cluster.store.node_record("d1").unwrap().address;
    cluster
        .store
        .record_heartbeat("d1", &d1_addr, timestamp_now() - 60)
        .unwrap();

    let now = timestamp_now();
    assert_eq!(cluster.monitor.list_alive(now), vec!["d0"]);
    for chunk_id in &chunk_ids {
        assert_eq!(cluster.store.get_replicas(chunk_id).len(), 2);
    }

    let fetched = cluster.reassembly.download("big.bin").await.unwrap();
    assert_eq!(&fetched[..], &data[..]);
}

#[tokio::test]
async fn test_upload_with_no_alive_nodes() {
    let cluster = cluster(&[]).await;

    let chunks = chunker::split(&test_payload(1024), CHUNK_SIZE);
    let err = cluster.upload.ingest("a.bin", chunks).await.unwrap_err();
    assert!(matches!(err, Error::PlacementFailed(_)));

    // no partial registration
    assert!(matches!(
        cluster.store.get_file_chunks("a.bin"),
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_download_unavailable_when_all_replicas_dead() {
    let cluster = cluster(&["d0"]).await;

    let data = test_payload(4096);
    cluster
        .upload
        .ingest("a.bin", chunker::split(&data, CHUNK_SIZE))
        .await
        .unwrap();

    let d0_addr = cluster.store.node_record("d0").unwrap().address;
    cluster
        .store
        .record_heartbeat("d0", &d0_addr, timestamp_now() - 60)
        .unwrap();

    let err = cluster.reassembly.download("a.bin").await.unwrap_err();
    assert!(matches!(err, Error::Unavailable(_)));
}

#[tokio::test]
async fn test_datanode_rejects_corrupted_payload() {
    let dir = TempDir::new().unwrap();
    let addr = start_datanode(&dir, "d0").await;

    let mut stream = tokio::net::TcpStream::connect(&addr).await.unwrap();
    let req = Request::Store {
        chunk_id: "deadbeef-0000".to_string(),
        checksum: blake3::hash(b"what was sent").to_string(),
    };
    write_frame(&mut stream, &req, b"what actually arrived")
        .await
        .unwrap();

    let (resp, _) = read_frame::<_, Response>(&mut stream).await.unwrap();
    assert!(matches!(resp, Response::Error { .. }));

    // nothing was stored under that id
    let transport = TcpTransport::new();
    assert!(matches!(
        transport.fetch_chunk(&addr, "deadbeef-0000").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_transport_round_trip_verifies_checksum() {
    let dir = TempDir::new().unwrap();
    let addr = start_datanode(&dir, "d0").await;
    let transport = TcpTransport::new();

    let payload = Bytes::from(test_payload(64 * 1024));
    transport.send_chunk(&addr, "cafe-1", &payload).await.unwrap();

    let fetched = transport.fetch_chunk(&addr, "cafe-1").await.unwrap();
    assert_eq!(fetched, payload);
}

#[tokio::test]
async fn test_heartbeat_wire_registers_node() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        MetadataStore::open(dir.path().join("metadata.json"), OverwritePolicy::Reject).unwrap(),
    );
    let monitor = Arc::new(HeartbeatMonitor::new(store.clone(), 10));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(heartbeat::run_listener(listener, monitor.clone()));

    datanode::send_heartbeat(&addr, "d7", "127.0.0.1:7777")
        .await
        .unwrap();

    // the listener records the beat asynchronously
    let mut registered = false;
    for _ in 0..50 {
        if monitor.is_alive("d7", timestamp_now()) {
            registered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(registered, "heartbeat never registered");
    assert_eq!(store.node_record("d7").unwrap().address, "127.0.0.1:7777");
}

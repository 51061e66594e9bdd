//! Heartbeat tracking and liveness
//!
//! Liveness is never stored: it is derived on demand from
//! `(now, last_heartbeat, timeout)`, so it is unit-testable without clocks
//! or background tasks. The TCP listener accepts framed HEARTBEAT messages
//! from datanodes; the sweep task only logs Alive↔Dead transitions.

use crate::common::wire::{read_frame, Request};
use crate::common::{timestamp_now, NodeState, Result};
use crate::coordinator::metadata::MetadataStore;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Derived per-node status for the query surface
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    pub node_id: String,
    pub address: String,
    pub state: NodeState,
    pub last_heartbeat: u64,
}

/// Heartbeat monitor
pub struct HeartbeatMonitor {
    store: Arc<MetadataStore>,
    timeout_secs: u64,
}

impl HeartbeatMonitor {
    pub fn new(store: Arc<MetadataStore>, timeout_secs: u64) -> Self {
        Self { store, timeout_secs }
    }

    /// Register the node if unknown, else refresh its last-seen timestamp.
    pub fn record(&self, node_id: &str, address: &str, timestamp: u64) -> Result<()> {
        tracing::debug!(node_id, address, "heartbeat");
        self.store.record_heartbeat(node_id, address, timestamp)
    }

    /// True iff the node heartbeated within the timeout. Unknown → false.
    pub fn is_alive(&self, node_id: &str, now: u64) -> bool {
        match self.store.node_record(node_id) {
            Some(rec) => now.saturating_sub(rec.last_heartbeat) <= self.timeout_secs,
            None => false,
        }
    }

    /// Sorted identifiers of currently alive nodes.
    pub fn list_alive(&self, now: u64) -> Vec<String> {
        self.store
            .node_records()
            .into_iter()
            .filter(|(_, rec)| now.saturating_sub(rec.last_heartbeat) <= self.timeout_secs)
            .map(|(id, _)| id)
            .collect()
    }

    /// Status of every known node.
    pub fn statuses(&self, now: u64) -> Vec<NodeStatus> {
        self.store
            .node_records()
            .into_iter()
            .map(|(node_id, rec)| {
                let state = if now.saturating_sub(rec.last_heartbeat) <= self.timeout_secs {
                    NodeState::Alive
                } else {
                    NodeState::Dead
                };
                NodeStatus {
                    node_id,
                    address: rec.address,
                    state,
                    last_heartbeat: rec.last_heartbeat,
                }
            })
            .collect()
    }
}

/// Accept heartbeat connections, one task each.
pub async fn run_listener(listener: TcpListener, monitor: Arc<HeartbeatMonitor>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let monitor = monitor.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_heartbeat(stream, &monitor).await {
                        tracing::debug!("heartbeat connection error: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::warn!("heartbeat accept error: {}", e);
            }
        }
    }
}

async fn handle_heartbeat(mut stream: TcpStream, monitor: &HeartbeatMonitor) -> Result<()> {
    let (req, _payload) = read_frame::<_, Request>(&mut stream).await?;
    match req {
        Request::Heartbeat {
            node_id,
            address,
            timestamp,
        } => monitor.record(&node_id, &address, timestamp),
        other => {
            tracing::warn!("unexpected message on heartbeat port: {:?}", other);
            Ok(())
        }
    }
}

/// Periodically log liveness transitions.
///
/// Not required for correctness; liveness stays a pure read-time function.
pub async fn run_sweep(monitor: Arc<HeartbeatMonitor>, interval: Duration) {
    let mut dead: HashSet<String> = HashSet::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let now = timestamp_now();
        for status in monitor.statuses(now) {
            match status.state {
                NodeState::Dead => {
                    if dead.insert(status.node_id.clone()) {
                        tracing::warn!(node_id = %status.node_id, "datanode marked dead");
                    }
                }
                NodeState::Alive => {
                    if dead.remove(&status.node_id) {
                        tracing::info!(node_id = %status.node_id, "datanode back alive");
                    }
                }
            }
        }
    }
}

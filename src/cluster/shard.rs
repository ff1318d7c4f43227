//! Shard implementation
//!
//! Each shard runs in its own thread with a dedicated `ShardMap`. The thread
//! drains a FIFO queue of operations one at a time, so operations on a shard
//! execute in submission order and never overlap. Snapshots and restores go
//! through the same queue, which makes a failover replacement exclusive with
//! user operations.

use crate::error::{Result, StoreError};
use crate::store::{Entry, ShardMap, Snapshot};
use bytes::Bytes;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// An operation queued on a shard
pub(crate) enum Operation {
    Write {
        key: String,
        value: Bytes,
        response_tx: oneshot::Sender<u64>,
    },
    Read {
        key: String,
        response_tx: oneshot::Sender<Option<Entry>>,
    },
    Snapshot {
        response_tx: oneshot::Sender<Snapshot>,
    },
    Restore {
        snapshot: Snapshot,
        response_tx: oneshot::Sender<usize>,
    },
    Stats {
        response_tx: oneshot::Sender<ShardStats>,
    },
}

/// Statistics for a single shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardStats {
    pub shard_id: usize,
    pub alive: bool,
    pub keys: usize,
    pub memory_bytes: usize,
    pub writes: u64,
    pub reads: u64,
}

/// Handle to a shard and its worker thread
pub struct ShardStore {
    /// Shard ID
    id: usize,

    /// Queue feeding the worker thread
    op_tx: mpsc::UnboundedSender<Operation>,

    /// Liveness flag, shared with the worker for stats
    alive: Arc<AtomicBool>,
}

impl ShardStore {
    /// Create a new shard and start its thread
    pub fn spawn(shard_id: usize) -> Result<Self> {
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        let alive = Arc::new(AtomicBool::new(true));
        let worker_alive = alive.clone();

        std::thread::Builder::new()
            .name(format!("shard-{}", shard_id))
            .spawn(move || run_worker(shard_id, op_rx, worker_alive))
            .map_err(|e| StoreError::WorkerSpawn {
                shard_id,
                reason: e.to_string(),
            })?;

        debug!("Shard {} started", shard_id);

        Ok(ShardStore {
            id: shard_id,
            op_tx,
            alive,
        })
    }

    /// A shard whose worker is already gone
    #[cfg(test)]
    pub(crate) fn closed(shard_id: usize) -> Self {
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        drop(op_rx);
        ShardStore {
            id: shard_id,
            op_tx,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get shard ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current liveness flag
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Flip the liveness flag; used to inject failures
    pub fn simulate_failure(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    /// Write a value; resolves once the value is applied
    pub async fn write(&self, key: impl Into<String>, value: impl Into<Bytes>) -> Result<()> {
        self.ensure_alive()?;
        let key = key.into();
        let value = value.into();
        self.submit(|response_tx| Operation::Write {
            key,
            value,
            response_tx,
        })
        .await?;
        Ok(())
    }

    /// Read the value of a key
    pub async fn read(&self, key: &str) -> Result<Bytes> {
        self.read_entry(key).await.map(|entry| entry.value)
    }

    /// Read the full entry of a key, version included
    pub async fn read_entry(&self, key: &str) -> Result<Entry> {
        self.ensure_alive()?;
        let owned = key.to_string();
        self.submit(|response_tx| Operation::Read {
            key: owned,
            response_tx,
        })
        .await?
        .ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    /// Deep copy of the shard's current contents
    ///
    /// Not gated by liveness: a down shard can still be inspected.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.submit(|response_tx| Operation::Snapshot { response_tx })
            .await
    }

    /// Replace the shard's contents wholesale, returns the number of keys
    pub async fn restore(&self, snapshot: Snapshot) -> Result<usize> {
        self.submit(|response_tx| Operation::Restore {
            snapshot,
            response_tx,
        })
        .await
    }

    /// Get statistics from this shard
    pub async fn stats(&self) -> Result<ShardStats> {
        self.submit(|response_tx| Operation::Stats { response_tx })
            .await
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(StoreError::ShardUnavailable { shard_id: self.id })
        }
    }

    /// Enqueue an operation and wait for the worker's reply
    async fn submit<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Operation) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        let closed = StoreError::ShardClosed { shard_id: self.id };

        self.op_tx.send(make(tx)).map_err(|_| closed.clone())?;
        rx.await.map_err(|_| closed)
    }
}

impl Drop for ShardStore {
    fn drop(&mut self) {
        debug!("Shard {} dropped", self.id);
    }
}

/// The loop that runs in the shard's thread
fn run_worker(shard_id: usize, mut op_rx: mpsc::UnboundedReceiver<Operation>, alive: Arc<AtomicBool>) {
    let mut map = ShardMap::new();
    let mut writes: u64 = 0;
    let mut reads: u64 = 0;

    // A dropped reply receiver means the caller went away; the operation
    // still counts as executed.
    while let Some(op) = op_rx.blocking_recv() {
        match op {
            Operation::Write {
                key,
                value,
                response_tx,
            } => {
                let version = map.set(key.as_str(), value);
                writes += 1;
                debug!("Shard {} wrote '{}' (version {})", shard_id, key, version);
                let _ = response_tx.send(version);
            }
            Operation::Read { key, response_tx } => {
                reads += 1;
                let _ = response_tx.send(map.get(&key).cloned());
            }
            Operation::Snapshot { response_tx } => {
                let _ = response_tx.send(map.snapshot());
            }
            Operation::Restore {
                snapshot,
                response_tx,
            } => {
                map.restore(snapshot);
                info!("Shard {} restored with {} keys", shard_id, map.len());
                let _ = response_tx.send(map.len());
            }
            Operation::Stats { response_tx } => {
                let _ = response_tx.send(ShardStats {
                    shard_id,
                    alive: alive.load(Ordering::SeqCst),
                    keys: map.len(),
                    memory_bytes: map.memory_usage(),
                    writes,
                    reads,
                });
            }
        }
    }

    info!("Shard {} shutting down", shard_id);
}

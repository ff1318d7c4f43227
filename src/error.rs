//! Error types returned by the store

use thiserror::Error;

/// Errors surfaced to callers of the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Invalid construction parameters. The store is not usable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Read of a key that was never written.
    #[error("key '{key}' not found")]
    NotFound { key: String },

    /// The shard's liveness flag is down; the operation was rejected.
    #[error("shard {shard_id} is unavailable")]
    ShardUnavailable { shard_id: usize },

    /// Shard index outside the store's range.
    #[error("shard {shard_id} does not exist (store has {num_shards} shards)")]
    UnknownShard { shard_id: usize, num_shards: usize },

    /// The OS refused to start a shard's worker thread.
    #[error("failed to start shard {shard_id} worker: {reason}")]
    WorkerSpawn { shard_id: usize, reason: String },

    /// The shard worker is gone and can no longer answer.
    #[error("shard {shard_id} worker is closed")]
    ShardClosed { shard_id: usize },
}

impl StoreError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        StoreError::Config(msg.into())
    }

    /// True for the "key absent" case, which callers usually handle apart.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

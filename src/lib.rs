//! shardkv - A sharded in-memory key-value store
//!
//! Keys are placed on a fixed number of shards by the sum of their code
//! points. Each shard owns its map and a worker thread that executes its
//! operations one at a time, in submission order. A background task mirrors
//! every shard to a backup and replaces a failed shard with its last backup.

pub mod cluster;
pub mod config;
pub mod error;
pub mod store;
pub mod web;

/// Re-export commonly used types
pub use cluster::{index_for, CycleOutcome, DistributedStore, ShardDump, ShardRouter, ShardStats, ShardStore};
pub use config::{FailoverPolicy, StoreConfig};
pub use error::{Result, StoreError};
pub use store::{Entry, Snapshot};

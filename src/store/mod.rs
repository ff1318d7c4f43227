//! Shard-local storage module
//!
//! Provides the data structures one shard keeps in memory and the snapshot
//! type used for backups. This module knows nothing about routing, workers
//! or scheduling.

mod entry;
mod memory;
mod snapshot;

pub use entry::Entry;
pub use memory::ShardMap;
pub use snapshot::Snapshot;

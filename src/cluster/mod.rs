//! Cluster and sharding module
//!
//! `DistributedStore` owns a fixed set of shards, each running in its own
//! thread, and a background task that mirrors them to backups and fails a
//! shard over to its backup when it is marked down. Keys are placed with
//! `ShardRouter`.

mod backup;
mod router;
mod shard;

pub use backup::{BackupScheduler, BackupTask, CycleOutcome};
pub use router::{index_for, ShardRouter};
pub use shard::{ShardStats, ShardStore};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::store::Snapshot;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Diagnostic view of one shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardDump {
    pub shard_id: usize,
    pub alive: bool,
    pub snapshot: Snapshot,
}

/// Sharded key-value store with periodic backup and failover
pub struct DistributedStore {
    shards: Arc<Vec<ShardStore>>,
    router: ShardRouter,
    scheduler: Arc<BackupScheduler>,
    task: Mutex<Option<BackupTask>>,
    config: StoreConfig,
}

impl DistributedStore {
    /// Create the store, its shards, and start the backup task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| StoreError::config("the store must be created inside a Tokio runtime"))?;

        info!("Initializing store with {} shards", config.num_shards);

        let router = ShardRouter::new(config.num_shards)?;
        let shards = (0..config.num_shards)
            .map(ShardStore::spawn)
            .collect::<Result<Vec<_>>>()?;
        let shards = Arc::new(shards);

        let scheduler = Arc::new(BackupScheduler::new(
            shards.clone(),
            config.failover_policy,
            config.backup_interval(),
        ));
        let task = scheduler.clone().spawn(&runtime);

        info!("Store initialized with {} shards", config.num_shards);

        Ok(DistributedStore {
            shards,
            router,
            scheduler,
            task: Mutex::new(Some(task)),
            config,
        })
    }

    /// Default configuration with a fixed shard count
    pub fn with_shards(num_shards: usize) -> Result<Self> {
        Self::new(StoreConfig::with_shards(num_shards))
    }

    /// Write a value to the shard owning `key`
    pub async fn write(&self, key: impl Into<String>, value: impl Into<Bytes>) -> Result<()> {
        let key = key.into();
        let shard_id = self.router.route_key(&key);
        debug!("write '{}' -> shard {}", key, shard_id);
        self.shards[shard_id].write(key, value).await
    }

    /// Read a value from the shard owning `key`
    pub async fn read(&self, key: &str) -> Result<Bytes> {
        let shard_id = self.router.route_key(key);
        debug!("read '{}' -> shard {}", key, shard_id);
        self.shards[shard_id].read(key).await
    }

    /// Shard index owning `key`
    pub fn shard_for(&self, key: &str) -> usize {
        self.router.route_key(key)
    }

    /// Get number of shards
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Access a shard by index
    pub fn shard(&self, shard_id: usize) -> Result<&ShardStore> {
        self.shards.get(shard_id).ok_or(StoreError::UnknownShard {
            shard_id,
            num_shards: self.shards.len(),
        })
    }

    /// Mark a shard alive or failed
    pub fn simulate_failure(&self, shard_id: usize, alive: bool) -> Result<()> {
        let shard = self.shard(shard_id)?;
        if alive {
            info!("Shard {} marked alive", shard_id);
        } else {
            warn!("Shard {} marked failed", shard_id);
        }
        shard.simulate_failure(alive);
        Ok(())
    }

    /// Copy of every shard's state, in index order
    pub async fn dump(&self) -> Result<Vec<ShardDump>> {
        let mut dumps = Vec::with_capacity(self.shards.len());
        for shard in self.shards.iter() {
            dumps.push(ShardDump {
                shard_id: shard.id(),
                alive: shard.is_alive(),
                snapshot: shard.snapshot().await?,
            });
        }
        Ok(dumps)
    }

    /// Get detailed statistics for each shard
    pub async fn stats(&self) -> Result<Vec<ShardStats>> {
        let mut stats = Vec::with_capacity(self.shards.len());
        for shard in self.shards.iter() {
            stats.push(shard.stats().await?);
        }
        Ok(stats)
    }

    /// Run one backup cycle now, outside the periodic schedule
    pub async fn run_backup_cycle(&self) -> CycleOutcome {
        self.scheduler.run_cycle().await
    }

    /// Current backup of a shard
    pub async fn backup(&self, shard_id: usize) -> Result<Snapshot> {
        match self.scheduler.backup(shard_id).await {
            Some(snapshot) => Ok(snapshot),
            None => Err(StoreError::UnknownShard {
                shard_id,
                num_shards: self.shards.len(),
            }),
        }
    }

    /// Stop the backup task and wait for it; later calls do nothing
    pub async fn shutdown(&self) {
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            task.stop().await;
            info!("Store shut down");
        }
    }

    /// Whether the backup task is still running
    pub async fn is_running(&self) -> bool {
        match self.task.lock().await.as_ref() {
            Some(task) => !task.is_finished(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailoverPolicy;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn manual_config(num_shards: usize) -> StoreConfig {
        // Long interval: tests drive cycles themselves
        StoreConfig {
            num_shards,
            backup_interval_ms: 3_600_000,
            failover_policy: FailoverPolicy::FirstFailed,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let store = DistributedStore::new(manual_config(10)).unwrap();

        assert_ok!(store.write("a", "doing fine").await);
        assert_ok!(store.write("a", "doing fine").await);
        assert_eq!(store.read("a").await.unwrap(), Bytes::from("doing fine"));
        assert_eq!(store.shard_for("a"), 7);

        let dump = store.dump().await.unwrap();
        assert_eq!(dump[7].snapshot.value("a"), Some(&Bytes::from("doing fine")));

        assert!(store.read("zzz").await.unwrap_err().is_not_found());

        store.run_backup_cycle().await;
        store.simulate_failure(7, false).unwrap();
        assert_eq!(
            store.read("a").await.unwrap_err(),
            StoreError::ShardUnavailable { shard_id: 7 }
        );

        assert_eq!(
            store.run_backup_cycle().await,
            CycleOutcome::FailedOver { shards: vec![7] }
        );
        assert_eq!(store.read("a").await.unwrap(), Bytes::from("doing fine"));

        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_shards_is_config_error() {
        let result = DistributedStore::with_shards(0);
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_outside_runtime_is_config_error() {
        let result = DistributedStore::with_shards(2);
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[tokio::test]
    async fn test_keys_land_on_their_shard() {
        let store = DistributedStore::new(manual_config(4)).unwrap();
        let keys = ["alpha", "beta", "gamma", "delta", "", "é"];
        for key in keys {
            store.write(key, key.to_uppercase()).await.unwrap();
        }

        let dump = store.dump().await.unwrap();
        assert_eq!(dump.len(), 4);
        for (i, shard) in dump.iter().enumerate() {
            assert_eq!(shard.shard_id, i);
            assert!(shard.alive);
        }
        for key in keys {
            let owner = index_for(key, 4).unwrap();
            assert!(dump[owner].snapshot.get(key).is_some());
            assert_eq!(store.read(key).await.unwrap(), Bytes::from(key.to_uppercase()));
        }
        let total: usize = dump.iter().map(|shard| shard.snapshot.len()).sum();
        assert_eq!(total, keys.len());
    }

    #[tokio::test]
    async fn test_failed_shard_does_not_block_others() {
        let store = DistributedStore::new(manual_config(10)).unwrap();
        // "a" -> 7, "b" -> 8
        store.simulate_failure(7, false).unwrap();

        assert_err!(store.write("a", "x").await);
        assert_ok!(store.write("b", "y").await);
        assert_eq!(store.read("b").await.unwrap(), Bytes::from("y"));
    }

    #[tokio::test]
    async fn test_concurrent_writes_across_shards() {
        let store = Arc::new(DistributedStore::new(manual_config(8)).unwrap());

        let mut handles = Vec::new();
        for task in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    store.write(format!("k{}-{}", task, i), format!("{}", i)).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for task in 0..16 {
            assert_eq!(store.read(&format!("k{}-24", task)).await.unwrap(), Bytes::from("24"));
        }
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.iter().map(|s| s.keys).sum::<usize>(), 16 * 25);
    }

    #[tokio::test]
    async fn test_backup_fidelity() {
        let store = DistributedStore::new(manual_config(3)).unwrap();
        for i in 0..20 {
            store.write(format!("key{}", i), format!("v{}", i)).await.unwrap();
        }

        store.run_backup_cycle().await;

        let dump = store.dump().await.unwrap();
        for shard in dump {
            assert_eq!(store.backup(shard.shard_id).await.unwrap(), shard.snapshot);
        }
        assert!(matches!(
            store.backup(3).await,
            Err(StoreError::UnknownShard { shard_id: 3, num_shards: 3 })
        ));
    }

    #[tokio::test]
    async fn test_failover_without_prior_backup_empties_shard() {
        let store = DistributedStore::new(manual_config(10)).unwrap();
        store.write("a", "unsaved").await.unwrap();
        store.simulate_failure(7, false).unwrap();

        store.run_backup_cycle().await;
        assert!(store.read("a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_shard() {
        let store = DistributedStore::new(manual_config(2)).unwrap();
        assert_eq!(
            store.simulate_failure(5, false).unwrap_err(),
            StoreError::UnknownShard { shard_id: 5, num_shards: 2 }
        );
        assert!(store.shard(1).is_ok());
    }

    #[tokio::test]
    async fn test_scheduler_recovers_on_its_own() {
        let config = StoreConfig {
            num_shards: 10,
            backup_interval_ms: 20,
            failover_policy: FailoverPolicy::FirstFailed,
        };
        let store = DistributedStore::new(config).unwrap();
        store.write("a", "doing fine").await.unwrap();

        // Let at least one healthy cycle capture the write
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.simulate_failure(7, false).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.shard(7).unwrap().is_alive());
        assert_eq!(store.read("a").await.unwrap(), Bytes::from("doing fine"));
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_dropping_store_stops_backup_task() {
        let store = DistributedStore::new(manual_config(3)).unwrap();
        let scheduler = store.scheduler.clone();
        assert!(Arc::strong_count(&scheduler) > 2);

        drop(store);
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The cancelled task released its handle; only ours is left
        assert_eq!(Arc::strong_count(&scheduler), 1);
    }

    #[tokio::test]
    async fn test_config_is_kept() {
        let config = StoreConfig {
            failover_policy: FailoverPolicy::AllFailed,
            ..manual_config(5)
        };
        let store = DistributedStore::new(config.clone()).unwrap();

        assert_eq!(store.config(), &config);
        assert_eq!(store.num_shards(), store.config().num_shards);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let store = DistributedStore::new(manual_config(2)).unwrap();
        assert!(store.is_running().await);

        store.shutdown().await;
        assert!(!store.is_running().await);
        store.shutdown().await;

        // Shards keep serving after the scheduler is gone
        assert_ok!(store.write("k", "v").await);
    }
}

//! Periodic backup and failover
//!
//! Every cycle scans shards in index order. When all shards are alive, each
//! backup slot is overwritten with a fresh copy of its shard. When a shard is
//! down, its live state is replaced by its backup and it is marked alive
//! again; backups are left untouched for that cycle.
//!
//! Backups are best-effort: shards are copied one after the other, so a
//! cycle may capture them at different logical times.

use super::shard::ShardStore;
use crate::config::FailoverPolicy;
use crate::store::Snapshot;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a single backup cycle did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// All shards alive; this many backups were refreshed
    Mirrored { shards: usize },
    /// These shards were replaced by their backups
    FailedOver { shards: Vec<usize> },
}

/// Mirrors shards to backups and restores failed shards
pub struct BackupScheduler {
    shards: Arc<Vec<ShardStore>>,
    /// One slot per shard; held for a whole cycle so cycles never interleave
    backups: Mutex<Vec<Snapshot>>,
    policy: FailoverPolicy,
    interval: Duration,
}

impl BackupScheduler {
    pub fn new(shards: Arc<Vec<ShardStore>>, policy: FailoverPolicy, interval: Duration) -> Self {
        let backups = vec![Snapshot::default(); shards.len()];
        BackupScheduler {
            shards,
            backups: Mutex::new(backups),
            policy,
            interval,
        }
    }

    /// Copy of the current backup for a shard
    pub async fn backup(&self, shard_id: usize) -> Option<Snapshot> {
        self.backups.lock().await.get(shard_id).cloned()
    }

    /// Run one cycle
    pub async fn run_cycle(&self) -> CycleOutcome {
        let mut backups = self.backups.lock().await;

        let failed = self.failed_shards();
        if failed.is_empty() {
            return CycleOutcome::Mirrored {
                shards: self.mirror(&mut backups).await,
            };
        }

        let mut recovered = Vec::with_capacity(failed.len());
        for shard_id in failed {
            let shard = &self.shards[shard_id];
            let backup = backups[shard_id].clone();
            if backup.is_empty() {
                warn!("Shard {} failed with an empty backup", shard_id);
            }

            match shard.restore(backup).await {
                Ok(keys) => {
                    shard.simulate_failure(true);
                    warn!("Shard {} failed over to its backup ({} keys)", shard_id, keys);
                    recovered.push(shard_id);
                }
                Err(e) => error!("Failover of shard {} failed: {}", shard_id, e),
            }
        }

        CycleOutcome::FailedOver { shards: recovered }
    }

    /// Shards to recover this cycle, lowest index first
    fn failed_shards(&self) -> Vec<usize> {
        let mut down = self
            .shards
            .iter()
            .filter(|shard| !shard.is_alive())
            .map(|shard| shard.id());

        match self.policy {
            FailoverPolicy::FirstFailed => down.next().into_iter().collect(),
            FailoverPolicy::AllFailed => down.collect(),
        }
    }

    /// Refresh every backup slot, returns how many were refreshed
    async fn mirror(&self, backups: &mut [Snapshot]) -> usize {
        let mut refreshed = 0;
        for (shard, slot) in self.shards.iter().zip(backups.iter_mut()) {
            match shard.snapshot().await {
                Ok(snapshot) => {
                    *slot = snapshot;
                    refreshed += 1;
                }
                // Keep the last good copy
                Err(e) => error!("Backup of shard {} failed: {}", shard.id(), e),
            }
        }
        debug!("Backup cycle refreshed {}/{} shards", refreshed, self.shards.len());
        refreshed
    }

    /// Start the periodic task
    ///
    /// The first cycle runs one full interval after the call.
    pub fn spawn(self: Arc<Self>, runtime: &tokio::runtime::Handle) -> BackupTask {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Backup scheduler started (every {:?})", self.interval);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        self.run_cycle().await;
                    }
                }
            }

            info!("Backup scheduler stopped");
        });

        BackupTask {
            token,
            handle: Some(handle),
        }
    }
}

/// Handle to the running backup task
///
/// Dropping the handle cancels the task.
pub struct BackupTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl BackupTask {
    /// Cancel the task and wait for it to finish
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Backup scheduler ended abnormally: {}", e);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |handle| handle.is_finished())
    }
}

impl Drop for BackupTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

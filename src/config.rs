//! Store configuration
//!
//! Configuration can come from defaults, a JSON document, and environment
//! variables (applied last).

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable overriding the shard count
pub const ENV_SHARDS: &str = "SHARDKV_SHARDS";

/// Environment variable overriding the backup interval (milliseconds)
pub const ENV_BACKUP_INTERVAL_MS: &str = "SHARDKV_BACKUP_INTERVAL_MS";

/// Environment variable overriding the failover policy
pub const ENV_FAILOVER_POLICY: &str = "SHARDKV_FAILOVER_POLICY";

/// Default interval between two backup cycles
pub const DEFAULT_BACKUP_INTERVAL_MS: u64 = 1000;

/// Which failed shards a single backup cycle recovers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverPolicy {
    /// Recover only the lowest-index failed shard per cycle
    #[default]
    #[serde(alias = "first")]
    FirstFailed,
    /// Recover every failed shard in the same cycle
    #[serde(alias = "all")]
    AllFailed,
}

impl FromStr for FailoverPolicy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first_failed" => Ok(FailoverPolicy::FirstFailed),
            "all" | "all_failed" => Ok(FailoverPolicy::AllFailed),
            other => Err(StoreError::config(format!("unknown failover policy '{}'", other))),
        }
    }
}

/// Configuration of a [`DistributedStore`](crate::DistributedStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of shards, fixed for the store's lifetime
    pub num_shards: usize,

    /// Interval between backup cycles in milliseconds
    pub backup_interval_ms: u64,

    /// Failover behavior when several shards are down
    pub failover_policy: FailoverPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            // One shard per CPU core, min 1, max 16
            num_shards: num_cpus::get().clamp(1, 16),
            backup_interval_ms: DEFAULT_BACKUP_INTERVAL_MS,
            failover_policy: FailoverPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Default configuration with a fixed shard count
    pub fn with_shards(num_shards: usize) -> Self {
        StoreConfig {
            num_shards,
            ..Default::default()
        }
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::config(format!("malformed config: {}", e)))
    }

    /// Apply `SHARDKV_*` environment overrides on top of this config
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_SHARDS) {
            self.num_shards = raw
                .trim()
                .parse()
                .map_err(|_| StoreError::config(format!("{} must be an integer, got '{}'", ENV_SHARDS, raw)))?;
        }

        if let Some(raw) = lookup(ENV_BACKUP_INTERVAL_MS) {
            self.backup_interval_ms = raw.trim().parse().map_err(|_| {
                StoreError::config(format!("{} must be an integer, got '{}'", ENV_BACKUP_INTERVAL_MS, raw))
            })?;
        }

        if let Some(raw) = lookup(ENV_FAILOVER_POLICY) {
            self.failover_policy = raw.parse()?;
        }

        Ok(self)
    }

    /// Reject parameters the store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.num_shards == 0 {
            return Err(StoreError::config("number of shards must be at least 1"));
        }
        if self.backup_interval_ms == 0 {
            return Err(StoreError::config("backup interval must be positive"));
        }
        Ok(())
    }

    pub fn backup_interval(&self) -> Duration {
        Duration::from_millis(self.backup_interval_ms)
    }
}

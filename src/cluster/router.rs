//! Key routing logic for sharding
//!
//! Routes keys to shards by summing the code points of the key's characters
//! modulo the shard count. Placement is never rebalanced: the shard count is
//! fixed for a store's lifetime.

use crate::error::{Result, StoreError};

/// Compute the shard index owning `key`
///
/// The empty key maps to shard 0.
pub fn index_for(key: &str, num_shards: usize) -> Result<usize> {
    if num_shards == 0 {
        return Err(StoreError::config("number of shards must be at least 1"));
    }
    Ok(route(key, num_shards))
}

fn route(key: &str, num_shards: usize) -> usize {
    let sum: u64 = key.chars().map(|c| u64::from(u32::from(c))).sum();
    (sum % num_shards as u64) as usize
}

/// Routes keys to shards for a fixed shard count
#[derive(Debug, Clone, Copy)]
pub struct ShardRouter {
    num_shards: usize,
}

impl ShardRouter {
    /// Create a new shard router
    pub fn new(num_shards: usize) -> Result<Self> {
        if num_shards == 0 {
            return Err(StoreError::config("number of shards must be at least 1"));
        }
        Ok(ShardRouter { num_shards })
    }

    /// Route a key to a shard ID
    pub fn route_key(&self, key: &str) -> usize {
        route(key, self.num_shards)
    }

    /// Get the number of shards
    pub fn num_shards(&self) -> usize {
        self.num_shards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_deterministic() {
        let router = ShardRouter::new(4).unwrap();

        // Same key should always route to same shard
        let shard1 = router.route_key("test_key");
        let shard2 = router.route_key("test_key");
        assert_eq!(shard1, shard2);

        // A fresh router for the same count agrees
        assert_eq!(ShardRouter::new(4).unwrap().route_key("test_key"), shard1);
    }

    #[test]
    fn test_code_point_sum() {
        // 'a' = 97
        assert_eq!(index_for("a", 10).unwrap(), 7);
        // 'a' + 'b' = 195
        assert_eq!(index_for("ab", 10).unwrap(), 5);
        // Anagrams share a shard
        assert_eq!(index_for("ab", 7).unwrap(), index_for("ba", 7).unwrap());
        // Non-ASCII characters count by code point: 'é' = 233
        assert_eq!(index_for("é", 100).unwrap(), 33);
    }

    #[test]
    fn test_empty_key() {
        assert_eq!(index_for("", 10).unwrap(), 0);
    }

    #[test]
    fn test_single_shard() {
        let router = ShardRouter::new(1).unwrap();
        assert_eq!(router.route_key("any_key"), 0);
    }

    #[test]
    fn test_zero_shards_rejected() {
        assert!(matches!(index_for("a", 0), Err(StoreError::Config(_))));
        assert!(matches!(ShardRouter::new(0), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_index_in_range() {
        let router = ShardRouter::new(7).unwrap();
        for i in 0..500 {
            let key = format!("key_{}", i);
            assert!(router.route_key(&key) < 7);
            assert_eq!(router.route_key(&key), index_for(&key, 7).unwrap());
        }
    }
}

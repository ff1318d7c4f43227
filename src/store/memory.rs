//! In-memory map owned by a single shard

use super::entry::Entry;
use super::snapshot::Snapshot;
use bytes::Bytes;
use siphasher::sip::SipHasher13;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;

/// Type alias for our hash map with SipHasher
type StoreMap = HashMap<String, Entry, BuildHasherDefault<SipHasher13>>;

/// Key-value map of one shard
///
/// Not synchronized: the shard worker is its only owner, which is what
/// keeps operations on a key from overlapping.
pub struct ShardMap {
    store: StoreMap,
}

impl ShardMap {
    /// Create a new map with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new map with specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        ShardMap {
            store: HashMap::with_capacity_and_hasher(
                capacity,
                BuildHasherDefault::<SipHasher13>::default(),
            ),
        }
    }

    /// Set a key-value pair, returns the entry's new version
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Bytes>) -> u64 {
        let value = value.into();
        match self.store.entry(key.into()) {
            MapEntry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                entry.overwrite(value);
                entry.version
            }
            MapEntry::Vacant(slot) => slot.insert(Entry::new(value)).version,
        }
    }

    /// Get the entry for a key
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.store.get(key)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Approximate memory usage of stored data in bytes
    pub fn memory_usage(&self) -> usize {
        self.store
            .iter()
            .map(|(key, entry)| key.len() + entry.memory_usage())
            .sum()
    }

    /// Deep copy of the current contents
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_entries(
            self.store
                .iter()
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect(),
        )
    }

    /// Replace the whole contents with a snapshot
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.store.clear();
        self.store.extend(snapshot.into_entries());
    }
}

impl Default for ShardMap {
    fn default() -> Self {
        Self::new()
    }
}

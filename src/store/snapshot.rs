//! Point-in-time copies of a shard's data

use super::entry::Entry;
use bytes::Bytes;
use std::collections::BTreeMap;

/// Deep copy of a shard's key→entry mapping
///
/// Ordered by key so that dumps and comparisons are deterministic. The
/// default value is the empty snapshot a backup slot starts with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, Entry>,
}

impl Snapshot {
    pub(crate) fn from_entries(entries: BTreeMap<String, Entry>) -> Self {
        Snapshot { entries }
    }

    pub(crate) fn into_entries(self) -> BTreeMap<String, Entry> {
        self.entries
    }

    /// Entry captured for a key
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Value captured for a key
    pub fn value(&self, key: &str) -> Option<&Bytes> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }
}

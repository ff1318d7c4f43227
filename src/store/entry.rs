//! Entry structure for key-value pairs

use bytes::Bytes;

/// A stored value together with its write count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The value
    pub value: Bytes,

    /// Number of writes applied to this key (1 after the first write)
    pub version: u64,
}

impl Entry {
    /// Create an entry for a first write
    pub fn new(value: impl Into<Bytes>) -> Self {
        Entry {
            value: value.into(),
            version: 1,
        }
    }

    /// Overwrite the value and bump the version
    pub fn overwrite(&mut self, value: Bytes) {
        self.value = value;
        self.version = self.version.wrapping_add(1);
    }

    /// Approximate memory usage of this entry in bytes, key excluded
    pub fn memory_usage(&self) -> usize {
        self.value.len() + std::mem::size_of::<u64>()
    }
}

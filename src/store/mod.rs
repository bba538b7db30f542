//! The persistent key/value store interface and an in-memory implementation.

use std::collections::HashMap;
use std::sync::RwLock;

/// The key/value store snapshots are persisted to.
///
/// Writes are expected to be durable and idempotent; the snapshot manager
/// may write the same key/value pair more than once under concurrency.
pub trait EvoDb: Send + Sync {
    /// Reads the value stored under `key`, if any.
    fn read(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn write(&self, key: &[u8], value: &[u8]);
}

/// A process-local [`EvoDb`] backed by a hash map. Used by tests and by
/// deployments that rebuild snapshots on startup.
#[derive(Default)]
pub struct MemoryEvoDb {
    map: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryEvoDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.map.read().expect("evo db lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EvoDb for MemoryEvoDb {
    fn read(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.map.read().expect("evo db lock poisoned").get(key).cloned()
    }

    fn write(&self, key: &[u8], value: &[u8]) {
        self.map.write().expect("evo db lock poisoned").insert(key.to_vec(), value.to_vec());
    }
}

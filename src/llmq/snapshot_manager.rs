//! Two-tier snapshot storage: a bounded in-memory cache in front of the
//! persistent key/value store.

use std::sync::{Arc, Mutex};

use hashes::Hash;
use schnellru::{ByLength, LruMap};

use crate::consensus::{deserialize, serialize};
use crate::error::RotationError;
use crate::hash_types::{BlockHash, QuorumSnapshotHash};
use crate::llmq::params::LLMQType;
use crate::llmq::snapshot::QuorumSnapshot;
use crate::store::EvoDb;

/// Storage key prefix of persisted snapshots. A format change requires a new
/// prefix.
pub const DB_QUORUM_SNAPSHOT: &[u8] = b"llmq_S";

const DEFAULT_SNAPSHOT_CACHE_SIZE: u32 = 64;

/// Looks up and persists cycle snapshots keyed by `(quorum_type, block_hash)`.
///
/// One mutex serializes cache lookups and store writes. Snapshots are
/// immutable once written, so a duplicate `put` for the same key stores an
/// identical value and is harmless.
pub struct QuorumSnapshotManager {
    inner: Mutex<SnapshotManagerInner>,
}

struct SnapshotManagerInner {
    cache: LruMap<QuorumSnapshotHash, QuorumSnapshot, ByLength>,
    db: Arc<dyn EvoDb>,
}

impl QuorumSnapshotManager {
    pub fn new(db: Arc<dyn EvoDb>) -> Self {
        Self::with_cache_size(db, DEFAULT_SNAPSHOT_CACHE_SIZE)
    }

    /// A manager whose in-memory tier holds at most `cache_size` snapshots,
    /// evicting least-recently-used entries. Eviction never loses data; the
    /// store remains authoritative.
    pub fn with_cache_size(db: Arc<dyn EvoDb>, cache_size: u32) -> Self {
        QuorumSnapshotManager {
            inner: Mutex::new(SnapshotManagerInner {
                cache: LruMap::new(ByLength::new(cache_size)),
                db,
            }),
        }
    }

    /// The snapshot written at `block_hash` for `llmq_type`, if any.
    pub fn get(
        &self,
        llmq_type: LLMQType,
        block_hash: &BlockHash,
    ) -> Result<Option<QuorumSnapshot>, RotationError> {
        let snapshot_hash = QuorumSnapshotHash::for_block(llmq_type, *block_hash);
        let mut inner = self.inner.lock().expect("snapshot manager mutex poisoned");

        if let Some(snapshot) = inner.cache.get(&snapshot_hash) {
            return Ok(Some(snapshot.clone()));
        }

        let Some(raw) = inner.db.read(&db_key(&snapshot_hash)) else {
            return Ok(None);
        };
        let snapshot: QuorumSnapshot = deserialize(&raw)?;
        inner.cache.insert(snapshot_hash, snapshot.clone());
        Ok(Some(snapshot))
    }

    /// Persists the snapshot for `(llmq_type, block_hash)` and caches it.
    pub fn put(&self, llmq_type: LLMQType, block_hash: &BlockHash, snapshot: &QuorumSnapshot) {
        let snapshot_hash = QuorumSnapshotHash::for_block(llmq_type, *block_hash);
        let raw = serialize(snapshot);
        let mut inner = self.inner.lock().expect("snapshot manager mutex poisoned");
        inner.db.write(&db_key(&snapshot_hash), &raw);
        inner.cache.insert(snapshot_hash, snapshot.clone());
        tracing::trace!(
            %block_hash,
            llmq_type = %llmq_type,
            members = snapshot.active_quorum_members.len(),
            mode = ?snapshot.skip_list_mode,
            "stored quorum snapshot"
        );
    }
}

fn db_key(snapshot_hash: &QuorumSnapshotHash) -> Vec<u8> {
    let mut key = Vec::with_capacity(DB_QUORUM_SNAPSHOT.len() + 32);
    key.extend_from_slice(DB_QUORUM_SNAPSHOT);
    key.extend_from_slice(&snapshot_hash.to_byte_array());
    key
}

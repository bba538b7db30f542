//! The chain-facing collaborator interface.
//!
//! The rotation core never walks headers itself; everything it needs from
//! the block index, the masternode registry and the mined-commitment index
//! is consumed through [`ChainProvider`]. Callers are expected to hold
//! whatever registry read lock their implementation requires before calling
//! into the core.

use std::sync::Arc;

use crate::hash_types::BlockHash;
use crate::llmq::params::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::CoreBlockHeight;

/// A resolved block: its height on the active chain and its hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockInfo {
    pub height: CoreBlockHeight,
    pub hash: BlockHash,
}

impl BlockInfo {
    pub fn new(height: CoreBlockHeight, hash: BlockHash) -> Self {
        BlockInfo { height, hash }
    }
}

/// Read-only view of the chain state the rotation core depends on.
///
/// Implementations must be deterministic for a fixed chain state: the same
/// hash resolves to the same block, and masternode lists do not mutate after
/// they are produced for a block.
pub trait ChainProvider: Send + Sync {
    /// The tip of the active chain.
    fn tip(&self) -> Option<BlockInfo>;

    /// The genesis block.
    fn genesis(&self) -> Option<BlockInfo>;

    /// Resolves a block hash against the index.
    fn block_by_hash(&self, hash: &BlockHash) -> Option<BlockInfo>;

    /// Resolves a height on the active chain.
    fn block_by_height(&self, height: CoreBlockHeight) -> Option<BlockInfo>;

    /// Whether the block is part of the active chain.
    fn contains(&self, block: &BlockInfo) -> bool;

    /// The deterministic masternode list as of the given block.
    fn masternode_list_at(&self, block_hash: &BlockHash) -> Option<Arc<MasternodeList>>;

    /// Anchor blocks of mined quorum commitments of the given type at or
    /// before `until`, newest first.
    fn mined_commitment_blocks(&self, llmq_type: LLMQType, until: &BlockInfo) -> Vec<BlockInfo>;
}

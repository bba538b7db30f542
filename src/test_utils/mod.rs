//! Fixtures shared by unit and integration tests: deterministic hashes,
//! masternode entries and an in-memory chain provider.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use hashes::Hash;

use crate::chain::{BlockInfo, ChainProvider};
use crate::hash_types::{BlockHash, ConfirmedHash, ProTxHash};
use crate::llmq::params::LLMQType;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::CoreBlockHeight;

/// A deterministic block hash derived from a counter.
pub fn test_block_hash(n: u64) -> BlockHash {
    BlockHash::hash(&n.to_le_bytes())
}

/// A deterministic registered masternode derived from a counter.
pub fn test_entry(n: u8) -> MasternodeListEntry {
    MasternodeListEntry::new(
        ProTxHash::hash(&[n]),
        ConfirmedHash::hash(&[n, 0xC0]),
        true,
    )
}

/// A single-branch chain held in memory, with per-block masternode lists
/// and mined-commitment anchors.
#[derive(Default)]
pub struct InMemoryChain {
    blocks: Vec<BlockInfo>,
    by_hash: HashMap<BlockHash, CoreBlockHeight>,
    mn_lists: HashMap<BlockHash, Arc<MasternodeList>>,
    commitments: BTreeMap<LLMQType, Vec<CoreBlockHeight>>,
}

impl InMemoryChain {
    /// A chain from genesis up to and including `tip_height`, with
    /// deterministic block hashes.
    pub fn with_height(tip_height: CoreBlockHeight) -> Self {
        let mut chain = InMemoryChain::default();
        for height in 0..=tip_height {
            let hash = test_block_hash(height as u64);
            chain.blocks.push(BlockInfo::new(height, hash));
            chain.by_hash.insert(hash, height);
        }
        chain
    }

    /// The hash of the block at `height`. Panics when the chain is shorter.
    pub fn hash_at(&self, height: CoreBlockHeight) -> BlockHash {
        self.blocks[height as usize].hash
    }

    /// Installs a masternode list at one block.
    pub fn set_masternode_list_at(
        &mut self,
        height: CoreBlockHeight,
        entries: Vec<MasternodeListEntry>,
    ) {
        let hash = self.hash_at(height);
        self.mn_lists
            .insert(hash, Arc::new(MasternodeList::with_masternodes(hash, height, entries)));
    }

    /// Installs the same registry at every block of the chain.
    pub fn set_masternode_list_for_all(&mut self, entries: Vec<MasternodeListEntry>) {
        for height in 0..self.blocks.len() as CoreBlockHeight {
            self.set_masternode_list_at(height, entries.clone());
        }
    }

    /// Records a mined commitment of `llmq_type` anchored at `height`.
    pub fn add_mined_commitment(&mut self, llmq_type: LLMQType, height: CoreBlockHeight) {
        let heights = self.commitments.entry(llmq_type).or_default();
        heights.push(height);
        heights.sort_unstable();
    }
}

impl ChainProvider for InMemoryChain {
    fn tip(&self) -> Option<BlockInfo> {
        self.blocks.last().copied()
    }

    fn genesis(&self) -> Option<BlockInfo> {
        self.blocks.first().copied()
    }

    fn block_by_hash(&self, hash: &BlockHash) -> Option<BlockInfo> {
        self.by_hash.get(hash).map(|height| self.blocks[*height as usize])
    }

    fn block_by_height(&self, height: CoreBlockHeight) -> Option<BlockInfo> {
        self.blocks.get(height as usize).copied()
    }

    fn contains(&self, block: &BlockInfo) -> bool {
        self.blocks.get(block.height as usize).map(|known| known.hash == block.hash).unwrap_or(false)
    }

    fn masternode_list_at(&self, block_hash: &BlockHash) -> Option<Arc<MasternodeList>> {
        self.mn_lists.get(block_hash).cloned()
    }

    fn mined_commitment_blocks(&self, llmq_type: LLMQType, until: &BlockInfo) -> Vec<BlockInfo> {
        let Some(heights) = self.commitments.get(&llmq_type) else {
            return Vec::new();
        };
        heights
            .iter()
            .rev()
            .filter(|height| **height <= until.height)
            .map(|height| self.blocks[*height as usize])
            .collect()
    }
}

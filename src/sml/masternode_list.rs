use std::collections::BTreeMap;

use crate::hash_types::{BlockHash, ProTxHash, QuorumModifierHash, ScoreHash};
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::CoreBlockHeight;

/// The deterministic masternode list as of one block.
///
/// Iteration is in ascending `pro_tx_hash` order; that order is what
/// snapshot bit positions refer to, so it must never change.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MasternodeList {
    pub block_hash: BlockHash,
    pub known_height: CoreBlockHeight,
    pub masternodes: BTreeMap<ProTxHash, MasternodeListEntry>,
}

impl MasternodeList {
    /// An empty list anchored at a block.
    pub fn empty(block_hash: BlockHash, known_height: CoreBlockHeight) -> Self {
        MasternodeList { block_hash, known_height, masternodes: BTreeMap::new() }
    }

    pub fn with_masternodes<I>(
        block_hash: BlockHash,
        known_height: CoreBlockHeight,
        entries: I,
    ) -> Self
    where
        I: IntoIterator<Item = MasternodeListEntry>,
    {
        let masternodes = entries.into_iter().map(|mn| (mn.pro_tx_hash, mn)).collect();
        MasternodeList { block_hash, known_height, masternodes }
    }

    /// Number of registered masternodes, banned ones included.
    pub fn count(&self) -> usize {
        self.masternodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masternodes.is_empty()
    }

    pub fn contains(&self, pro_tx_hash: &ProTxHash) -> bool {
        self.masternodes.contains_key(pro_tx_hash)
    }

    /// Inserts an entry, returning whether it was new.
    pub fn add(&mut self, entry: MasternodeListEntry) -> bool {
        self.masternodes.insert(entry.pro_tx_hash, entry).is_none()
    }

    /// Visits masternodes in the list's stable order. With
    /// `include_banned == false`, PoSe-banned entries are skipped.
    pub fn for_each<F>(&self, include_banned: bool, mut f: F)
    where
        F: FnMut(&MasternodeListEntry),
    {
        for entry in self.masternodes.values() {
            if include_banned || entry.is_valid {
                f(entry);
            }
        }
    }

    /// Deterministically selects the first `k` masternodes of this list
    /// ordered by score under `modifier`. Side-effect free; identical on
    /// every honest node.
    pub fn calculate_quorum(
        &self,
        k: usize,
        modifier: QuorumModifierHash,
    ) -> Vec<MasternodeListEntry> {
        let mut ordered =
            Self::order_by_quorum_score(self.masternodes.values().cloned().collect(), modifier);
        ordered.truncate(k);
        ordered
    }

    /// Stable ascending sort of arbitrary entries by
    /// `H(modifier ‖ pro_tx_hash)`.
    pub fn order_by_quorum_score(
        entries: Vec<MasternodeListEntry>,
        modifier: QuorumModifierHash,
    ) -> Vec<MasternodeListEntry> {
        let mut scored: Vec<(ScoreHash, MasternodeListEntry)> = entries
            .into_iter()
            .map(|mn| (ScoreHash::create_score(modifier, mn.pro_tx_hash), mn))
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0));
        scored.into_iter().map(|(_, mn)| mn).collect()
    }
}

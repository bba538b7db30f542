use hashes::Hash;

use crate::error::RotationError;
use crate::hash_types::{BlockHash, ProTxHash};
use crate::internal_macros::impl_consensus_encoding;
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::MasternodeListEntry;
use crate::CoreBlockHeight;

/// A simplified masternode-list diff between two blocks.
///
/// An all-zero `base_block_hash` means the diff starts from an empty list,
/// which is how a light client bootstraps. Updated entries travel in
/// `new_masternodes` alongside genuinely new ones.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplifiedMnListDiff {
    pub base_block_hash: BlockHash,
    pub block_hash: BlockHash,
    pub deleted_masternodes: Vec<ProTxHash>,
    pub new_masternodes: Vec<MasternodeListEntry>,
}

impl_consensus_encoding!(
    SimplifiedMnListDiff,
    base_block_hash,
    block_hash,
    deleted_masternodes,
    new_masternodes
);

impl SimplifiedMnListDiff {
    /// Builds the diff transforming `base` into `to`. A `None` base produces
    /// a bootstrap diff with an all-zero base hash.
    pub fn from_lists(base: Option<&MasternodeList>, to: &MasternodeList) -> Self {
        let base_block_hash = base.map(|list| list.block_hash).unwrap_or_else(BlockHash::all_zeros);

        let mut deleted_masternodes = Vec::new();
        let mut new_masternodes = Vec::new();

        if let Some(base) = base {
            for pro_tx_hash in base.masternodes.keys() {
                if !to.contains(pro_tx_hash) {
                    deleted_masternodes.push(*pro_tx_hash);
                }
            }
        }
        for (pro_tx_hash, entry) in &to.masternodes {
            match base.and_then(|list| list.masternodes.get(pro_tx_hash)) {
                Some(previous) if previous == entry => {}
                _ => new_masternodes.push(entry.clone()),
            }
        }

        SimplifiedMnListDiff {
            base_block_hash,
            block_hash: to.block_hash,
            deleted_masternodes,
            new_masternodes,
        }
    }
}

impl MasternodeList {
    /// The simplified diff from this list to `to`.
    pub fn simplified_diff(&self, to: &MasternodeList) -> SimplifiedMnListDiff {
        SimplifiedMnListDiff::from_lists(Some(self), to)
    }

    /// Applies a diff produced against this list, yielding the list at the
    /// diff's target block.
    pub fn apply_diff(
        &self,
        diff: &SimplifiedMnListDiff,
        known_height: CoreBlockHeight,
    ) -> Result<MasternodeList, RotationError> {
        let from_scratch = diff.base_block_hash == BlockHash::all_zeros();
        if !from_scratch && diff.base_block_hash != self.block_hash {
            return Err(RotationError::DiffBaseMismatch {
                expected: self.block_hash,
                got: diff.base_block_hash,
            });
        }

        let mut result = if from_scratch {
            MasternodeList::empty(diff.block_hash, known_height)
        } else {
            let mut list = self.clone();
            list.block_hash = diff.block_hash;
            list.known_height = known_height;
            list
        };
        for pro_tx_hash in &diff.deleted_masternodes {
            result.masternodes.remove(pro_tx_hash);
        }
        for entry in &diff.new_masternodes {
            result.masternodes.insert(entry.pro_tx_hash, entry.clone());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{deserialize, serialize};
    use crate::test_utils::{test_block_hash, test_entry};

    fn list(block: u64, height: CoreBlockHeight, ids: &[u8]) -> MasternodeList {
        MasternodeList::with_masternodes(
            test_block_hash(block),
            height,
            ids.iter().copied().map(test_entry),
        )
    }

    #[test]
    fn diff_then_apply_is_identity() {
        let base = list(1, 100, &[1, 2, 3, 4]);
        let mut target = list(2, 124, &[2, 3, 4, 5, 6]);
        // One updated entry as well.
        let updated = *target.masternodes.keys().next().expect("non-empty");
        target.masternodes.get_mut(&updated).expect("entry").is_valid = false;

        let diff = base.simplified_diff(&target);
        assert_eq!(diff.deleted_masternodes.len(), 1);
        let applied = base.apply_diff(&diff, 124).expect("apply");
        assert_eq!(applied, target);
    }

    #[test]
    fn bootstrap_diff_carries_the_whole_list() {
        let target = list(2, 124, &[1, 2, 3]);
        let diff = SimplifiedMnListDiff::from_lists(None, &target);
        assert_eq!(diff.base_block_hash, BlockHash::all_zeros());
        assert_eq!(diff.new_masternodes.len(), 3);
        assert!(diff.deleted_masternodes.is_empty());

        let applied =
            MasternodeList::empty(test_block_hash(99), 0).apply_diff(&diff, 124).expect("apply");
        assert_eq!(applied, target);
    }

    #[test]
    fn apply_rejects_wrong_base() {
        let base = list(1, 100, &[1, 2]);
        let target = list(2, 124, &[1, 2, 3]);
        let diff = base.simplified_diff(&target);
        let other = list(7, 100, &[1, 2]);
        assert!(matches!(
            other.apply_diff(&diff, 124),
            Err(RotationError::DiffBaseMismatch { .. })
        ));
    }

    #[test]
    fn diff_wire_round_trip() {
        let base = list(1, 100, &[1, 2, 3]);
        let target = list(2, 124, &[2, 3, 4]);
        let diff = base.simplified_diff(&target);
        let encoded = serialize(&diff);
        let decoded: SimplifiedMnListDiff = deserialize(&encoded).expect("decode");
        assert_eq!(decoded, diff);
    }
}

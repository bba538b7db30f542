use crate::hash_types::{ConfirmedHash, ProTxHash};
use crate::internal_macros::impl_consensus_encoding;

/// A single registered masternode as the selection algorithm sees it.
///
/// Entries are immutable values identified by `pro_tx_hash`; quarters,
/// caches and diffs clone them freely. `is_valid == false` marks a
/// PoSe-banned masternode.
#[derive(Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MasternodeListEntry {
    pub pro_tx_hash: ProTxHash,
    pub confirmed_hash: ConfirmedHash,
    pub is_valid: bool,
}

impl_consensus_encoding!(MasternodeListEntry, pro_tx_hash, confirmed_hash, is_valid);

impl MasternodeListEntry {
    pub fn new(pro_tx_hash: ProTxHash, confirmed_hash: ConfirmedHash, is_valid: bool) -> Self {
        MasternodeListEntry { pro_tx_hash, confirmed_hash, is_valid }
    }
}

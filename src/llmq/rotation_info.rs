//! Assembly of the quorum rotation info a light client needs to catch up:
//! the three prior cycle snapshots plus masternode-list diffs against
//! whatever base blocks the client already knows.

use std::io;

use hashes::Hash;

use crate::chain::{BlockInfo, ChainProvider};
use crate::consensus::encode::{read_compact_size, write_compact_size, Error};
use crate::consensus::{Decodable, Encodable};
use crate::error::RotationError;
use crate::hash_types::BlockHash;
use crate::internal_macros::impl_consensus_encoding;
use crate::llmq::params::ConsensusParams;
use crate::llmq::snapshot::QuorumSnapshot;
use crate::llmq::snapshot_manager::QuorumSnapshotManager;
use crate::sml::mn_list_diff::SimplifiedMnListDiff;

/// Upper bound on base block hashes a request may carry.
pub const MAX_BASE_BLOCK_HASHES: usize = 4;

/// A light client's request for rotation info.
///
/// `base_block_hashes` name masternode lists the client already has, newest
/// knowledge last; diffs in the response start from the best usable one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GetQuorumRotationInfo {
    pub base_block_hashes_nb: u32,
    pub base_block_hashes: Vec<BlockHash>,
    pub block_request_hash: BlockHash,
}

impl GetQuorumRotationInfo {
    pub fn new(base_block_hashes: Vec<BlockHash>, block_request_hash: BlockHash) -> Self {
        GetQuorumRotationInfo {
            base_block_hashes_nb: base_block_hashes.len() as u32,
            base_block_hashes,
            block_request_hash,
        }
    }
}

impl Encodable for GetQuorumRotationInfo {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = write_compact_size(w, self.base_block_hashes_nb as u64)?;
        for hash in &self.base_block_hashes {
            len += hash.consensus_encode(w)?;
        }
        len += self.block_request_hash.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for GetQuorumRotationInfo {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let count = read_compact_size(r)?;
        if count > u32::MAX as u64 {
            return Err(Error::ParseFailed("base block hash count out of range"));
        }
        let mut base_block_hashes = Vec::new();
        for _ in 0..count {
            base_block_hashes.push(BlockHash::consensus_decode(r)?);
        }
        let block_request_hash = BlockHash::consensus_decode(r)?;
        Ok(GetQuorumRotationInfo {
            base_block_hashes_nb: count as u32,
            base_block_hashes,
            block_request_hash,
        })
    }
}

/// The rotation info served back: the creation height of the newest rotated
/// quorum, snapshots at H−C, H−2C and H−3C, and list diffs bringing the
/// client to the tip and to each snapshot block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuorumRotationInfo {
    pub creation_height: i32,
    pub quorum_snapshot_at_h_minus_c: QuorumSnapshot,
    pub quorum_snapshot_at_h_minus_2c: QuorumSnapshot,
    pub quorum_snapshot_at_h_minus_3c: QuorumSnapshot,
    pub mn_list_diff_tip: SimplifiedMnListDiff,
    pub mn_list_diff_at_h_minus_c: SimplifiedMnListDiff,
    pub mn_list_diff_at_h_minus_2c: SimplifiedMnListDiff,
    pub mn_list_diff_at_h_minus_3c: SimplifiedMnListDiff,
}

impl_consensus_encoding!(
    QuorumRotationInfo,
    creation_height,
    quorum_snapshot_at_h_minus_c,
    quorum_snapshot_at_h_minus_2c,
    quorum_snapshot_at_h_minus_3c,
    mn_list_diff_tip,
    mn_list_diff_at_h_minus_c,
    mn_list_diff_at_h_minus_2c,
    mn_list_diff_at_h_minus_3c
);

/// Builds the rotation info for a request.
///
/// Rotation info is only served for the consensus rotation quorum type. The
/// four newest mined commitments of that type at or before the request
/// block anchor H, H−C, H−2C and H−3C.
pub fn build_quorum_rotation_info<C: ChainProvider>(
    chain: &C,
    consensus: &ConsensusParams,
    snapshots: &QuorumSnapshotManager,
    request: &GetQuorumRotationInfo,
) -> Result<QuorumRotationInfo, RotationError> {
    if request.base_block_hashes_nb as usize > MAX_BASE_BLOCK_HASHES {
        return Err(RotationError::BadRequest(format!(
            "requested {} base block hashes, maximum is {}",
            request.base_block_hashes_nb, MAX_BASE_BLOCK_HASHES
        )));
    }
    if request.base_block_hashes_nb as usize != request.base_block_hashes.len() {
        return Err(RotationError::BadRequest(format!(
            "base block hash count {} does not match {} hashes",
            request.base_block_hashes_nb,
            request.base_block_hashes.len()
        )));
    }

    let llmq_type = consensus.llmq_type_dip0024;
    consensus.params(llmq_type)?;

    // Resolve the client's bases, oldest first. With no bases at all the
    // client starts from genesis.
    let mut base_blocks = Vec::with_capacity(request.base_block_hashes.len().max(1));
    if request.base_block_hashes.is_empty() {
        base_blocks.push(chain.genesis().ok_or(RotationError::GenesisNotFound)?);
    } else {
        for hash in &request.base_block_hashes {
            let block = chain.block_by_hash(hash).ok_or(RotationError::BlockNotFound(*hash))?;
            if !chain.contains(&block) {
                return Err(RotationError::BlockNotInActiveChain(*hash));
            }
            base_blocks.push(block);
        }
        base_blocks.sort_by_key(|block| block.height);
    }

    let request_block = chain
        .block_by_hash(&request.block_request_hash)
        .ok_or(RotationError::BlockNotFound(request.block_request_hash))?;

    let commitments = chain.mined_commitment_blocks(llmq_type, &request_block);
    if commitments.len() < 4 {
        return Err(RotationError::NoQuorum {
            llmq_type,
            required: 4,
            found: commitments.len(),
        });
    }
    let block_h = commitments[0];
    let block_h_minus_c = commitments[1];
    let block_h_minus_2c = commitments[2];
    let block_h_minus_3c = commitments[3];

    let tip = chain.tip().ok_or(RotationError::TipNotFound)?;
    let newest_base = base_blocks.last().expect("at least one base block");
    let mn_list_diff_tip = diff_between(chain, newest_base.hash, &tip)?;

    let snapshot_at = |block: &BlockInfo| -> Result<(QuorumSnapshot, SimplifiedMnListDiff), RotationError> {
        let base_hash = get_last_base_block_hash(&base_blocks, block);
        let diff = diff_between(chain, base_hash, block)?;
        let snapshot = snapshots
            .get(llmq_type, &block.hash)?
            .ok_or(RotationError::SnapshotNotPresent(block.hash))?;
        Ok((snapshot, diff))
    };

    let (quorum_snapshot_at_h_minus_c, mn_list_diff_at_h_minus_c) = snapshot_at(&block_h_minus_c)?;
    let (quorum_snapshot_at_h_minus_2c, mn_list_diff_at_h_minus_2c) =
        snapshot_at(&block_h_minus_2c)?;
    let (quorum_snapshot_at_h_minus_3c, mn_list_diff_at_h_minus_3c) =
        snapshot_at(&block_h_minus_3c)?;

    tracing::debug!(
        request_block = %request_block.hash,
        creation_height = block_h.height,
        bases = base_blocks.len(),
        "assembled quorum rotation info"
    );

    Ok(QuorumRotationInfo {
        creation_height: block_h.height as i32,
        quorum_snapshot_at_h_minus_c,
        quorum_snapshot_at_h_minus_2c,
        quorum_snapshot_at_h_minus_3c,
        mn_list_diff_tip,
        mn_list_diff_at_h_minus_c,
        mn_list_diff_at_h_minus_2c,
        mn_list_diff_at_h_minus_3c,
    })
}

/// The highest client base at or below `block`, or the zero hash when the
/// client knows nothing that old. `base_blocks` must be sorted by height.
pub fn get_last_base_block_hash(base_blocks: &[BlockInfo], block: &BlockInfo) -> BlockHash {
    let mut hash = BlockHash::all_zeros();
    for base in base_blocks {
        if base.height > block.height {
            break;
        }
        hash = base.hash;
    }
    hash
}

/// Builds the simplified diff from `base_hash` (zero hash meaning "from
/// scratch") to `to`.
fn diff_between<C: ChainProvider>(
    chain: &C,
    base_hash: BlockHash,
    to: &BlockInfo,
) -> Result<SimplifiedMnListDiff, RotationError> {
    let to_list = chain
        .masternode_list_at(&to.hash)
        .ok_or(RotationError::MasternodeListNotPresent(to.hash))?;
    if base_hash == BlockHash::all_zeros() {
        return Ok(SimplifiedMnListDiff::from_lists(None, &to_list));
    }
    let base_list = chain
        .masternode_list_at(&base_hash)
        .ok_or(RotationError::MasternodeListNotPresent(base_hash))?;
    Ok(base_list.simplified_diff(&to_list))
}

//! Quorum member resolution: the rotation orchestrator and the non-rotated
//! fallback, fronted by per-type LRU caches.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use schnellru::{ByLength, LruMap};

use crate::chain::{BlockInfo, ChainProvider};
use crate::error::RotationError;
use crate::hash_types::{BlockHash, QuorumModifierHash};
use crate::llmq::params::{ConsensusParams, LLMQParams, LLMQType};
use crate::llmq::rotation::{
    build_new_quorum_quarter_members, quorum_quarter_members_from_snapshot, QuarterMembers,
};
use crate::llmq::snapshot_manager::QuorumSnapshotManager;
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// Key of the per-cycle member cache: which quorum index of which cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LLMQIndexedHash {
    pub cycle_base_hash: BlockHash,
    pub index: u32,
}

impl From<(BlockHash, u32)> for LLMQIndexedHash {
    fn from((cycle_base_hash, index): (BlockHash, u32)) -> Self {
        LLMQIndexedHash { cycle_base_hash, index }
    }
}

type MemberVec = Arc<Vec<MasternodeListEntry>>;

/// Both member caches, guarded together by one mutex.
struct MemberCaches {
    by_block_hash: BTreeMap<LLMQType, LruMap<BlockHash, MemberVec, ByLength>>,
    by_cycle_index: BTreeMap<LLMQType, LruMap<LLMQIndexedHash, MemberVec, ByLength>>,
}

impl MemberCaches {
    fn new() -> Self {
        MemberCaches { by_block_hash: BTreeMap::new(), by_cycle_index: BTreeMap::new() }
    }

    fn block_cache(
        &mut self,
        params: &LLMQParams,
    ) -> &mut LruMap<BlockHash, MemberVec, ByLength> {
        self.by_block_hash
            .entry(params.quorum_type)
            .or_insert_with(|| LruMap::new(ByLength::new(params.signing_active_quorum_count + 1)))
    }

    fn cycle_cache(
        &mut self,
        params: &LLMQParams,
    ) -> &mut LruMap<LLMQIndexedHash, MemberVec, ByLength> {
        self.by_cycle_index
            .entry(params.quorum_type)
            .or_insert_with(|| LruMap::new(ByLength::new(params.signing_active_quorum_count + 1)))
    }
}

/// Resolves the member set of any quorum, rotated or not.
///
/// All dependencies are injected at construction; the manager keeps no
/// global state. Member computation happens outside the cache lock, so two
/// racing callers may both compute a cycle; they produce identical vectors
/// and at most duplicate idempotent snapshot writes.
pub struct QuorumMemberManager<C: ChainProvider> {
    consensus: ConsensusParams,
    chain: Arc<C>,
    snapshots: Arc<QuorumSnapshotManager>,
    caches: Mutex<MemberCaches>,
}

impl<C: ChainProvider> QuorumMemberManager<C> {
    pub fn new(
        consensus: ConsensusParams,
        chain: Arc<C>,
        snapshots: Arc<QuorumSnapshotManager>,
    ) -> Self {
        QuorumMemberManager { consensus, chain, snapshots, caches: Mutex::new(MemberCaches::new()) }
    }

    /// The members of the quorum of `llmq_type` anchored at
    /// `quorum_block_hash`.
    pub fn quorum_members(
        &self,
        llmq_type: LLMQType,
        quorum_block_hash: &BlockHash,
    ) -> Result<MemberVec, RotationError> {
        let params = self.consensus.params(llmq_type)?.clone();
        let block = self
            .chain
            .block_by_hash(quorum_block_hash)
            .ok_or(RotationError::BlockNotFound(*quorum_block_hash))?;

        if self.consensus.rotation_active(llmq_type, block.height) {
            self.rotated_members(&params, &block)
        } else {
            self.non_rotated_members(&params, &block)
        }
    }

    /// The classic single-pass selection over the whole list at the quorum
    /// base block.
    fn non_rotated_members(
        &self,
        params: &LLMQParams,
        block: &BlockInfo,
    ) -> Result<MemberVec, RotationError> {
        {
            let mut caches = self.caches.lock().expect("member caches mutex poisoned");
            if let Some(members) = caches.block_cache(params).get(&block.hash) {
                return Ok(members.clone());
            }
        }

        let mn_list = self
            .chain
            .masternode_list_at(&block.hash)
            .ok_or(RotationError::MasternodeListNotPresent(block.hash))?;
        let modifier = QuorumModifierHash::for_block(params.quorum_type, block.hash);
        let members = Arc::new(mn_list.calculate_quorum(params.size as usize, modifier));
        tracing::debug!(
            llmq_type = %params.quorum_type,
            block_hash = %block.hash,
            members = members.len(),
            "computed non-rotated quorum members"
        );

        let mut caches = self.caches.lock().expect("member caches mutex poisoned");
        caches.block_cache(params).insert(block.hash, members.clone());
        Ok(members)
    }

    fn rotated_members(
        &self,
        params: &LLMQParams,
        block: &BlockInfo,
    ) -> Result<MemberVec, RotationError> {
        let cycle_length = params.dkg_params.interval;
        let quorum_index = block.height % cycle_length;
        if quorum_index >= params.signing_active_quorum_count {
            return Err(RotationError::BadRequest(format!(
                "block {} is {} past its cycle base, but only {} quorums rotate per cycle",
                block.hash, quorum_index, params.signing_active_quorum_count
            )));
        }
        let cycle_base_height = block.height - quorum_index;

        {
            let mut caches = self.caches.lock().expect("member caches mutex poisoned");
            if let Some(members) = caches.block_cache(params).get(&block.hash) {
                return Ok(members.clone());
            }
        }

        let cycle_base = self
            .chain
            .block_by_height(cycle_base_height)
            .ok_or(RotationError::BlockHeightNotFound(cycle_base_height))?;
        let indexed = LLMQIndexedHash::from((cycle_base.hash, quorum_index));
        {
            let mut caches = self.caches.lock().expect("member caches mutex poisoned");
            if let Some(members) = caches.cycle_cache(params).get(&indexed).cloned() {
                caches.block_cache(params).insert(block.hash, members.clone());
                return Ok(members);
            }
        }

        let cycle_quorums = self.compute_cycle_quorums(params, &cycle_base)?;

        let mut caches = self.caches.lock().expect("member caches mutex poisoned");
        for (index, members) in cycle_quorums.iter().enumerate() {
            caches
                .cycle_cache(params)
                .insert(LLMQIndexedHash::from((cycle_base.hash, index as u32)), members.clone());
        }
        let members = cycle_quorums
            .get(quorum_index as usize)
            .cloned()
            .ok_or_else(|| {
                RotationError::BadRequest(format!(
                    "no rotated members for quorum index {quorum_index} at cycle base {}",
                    cycle_base.hash
                ))
            })?;
        caches.block_cache(params).insert(block.hash, members.clone());
        Ok(members)
    }

    /// Computes every active quorum of the cycle at `cycle_base`: three
    /// quarters replayed from the prior cycles' snapshots plus the fresh
    /// quarter built (and persisted) here.
    fn compute_cycle_quorums(
        &self,
        params: &LLMQParams,
        cycle_base: &BlockInfo,
    ) -> Result<Vec<MemberVec>, RotationError> {
        let num_quorums = params.signing_active_quorum_count as usize;

        let quarters_h_minus_c = self.prior_quarter(params, cycle_base, 1)?;
        let quarters_h_minus_2c = self.prior_quarter(params, cycle_base, 2)?;
        let quarters_h_minus_3c = self.prior_quarter(params, cycle_base, 3)?;

        let mn_list = self
            .chain
            .masternode_list_at(&cycle_base.hash)
            .ok_or(RotationError::MasternodeListNotPresent(cycle_base.hash))?;
        let (fresh_quarters, snapshot) = build_new_quorum_quarter_members(
            params,
            &mn_list,
            cycle_base.hash,
            [&quarters_h_minus_c, &quarters_h_minus_2c, &quarters_h_minus_3c],
        );
        self.snapshots.put(params.quorum_type, &cycle_base.hash, &snapshot);

        let mut quorums = Vec::with_capacity(num_quorums);
        for index in 0..num_quorums {
            let mut members = Vec::with_capacity(params.size as usize);
            for quarters in
                [&quarters_h_minus_3c, &quarters_h_minus_2c, &quarters_h_minus_c, &fresh_quarters]
            {
                if let Some(quarter) = quarters.get(index) {
                    members.extend(quarter.iter().cloned());
                }
            }
            quorums.push(Arc::new(members));
        }
        tracing::debug!(
            llmq_type = %params.quorum_type,
            cycle_base = %cycle_base.hash,
            height = cycle_base.height,
            quorums = quorums.len(),
            "computed rotated quorums for cycle"
        );
        Ok(quorums)
    }

    /// The quarter picked `cycles_ago` cycles before `cycle_base`, replayed
    /// from its snapshot. Anything missing (pre-genesis height, unknown
    /// block, absent snapshot) propagates as empty quarters; at bootstrap
    /// that makes every prior masternode count as unused.
    fn prior_quarter(
        &self,
        params: &LLMQParams,
        cycle_base: &BlockInfo,
        cycles_ago: u32,
    ) -> Result<QuarterMembers, RotationError> {
        let num_quorums = params.signing_active_quorum_count as usize;
        let empty = || vec![Vec::new(); num_quorums];

        let Some(height) = cycle_base.height.checked_sub(cycles_ago * params.dkg_params.interval)
        else {
            return Ok(empty());
        };
        let Some(anchor) = self.chain.block_by_height(height) else {
            return Ok(empty());
        };
        let Some(snapshot) = self.snapshots.get(params.quorum_type, &anchor.hash)? else {
            tracing::trace!(
                llmq_type = %params.quorum_type,
                block_hash = %anchor.hash,
                height,
                "no snapshot for prior cycle, treating its quarters as empty"
            );
            return Ok(empty());
        };
        let mn_list = self
            .chain
            .masternode_list_at(&anchor.hash)
            .ok_or(RotationError::MasternodeListNotPresent(anchor.hash))?;
        Ok(quorum_quarter_members_from_snapshot(params, &mn_list, anchor.hash, &snapshot))
    }
}

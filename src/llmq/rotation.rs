//! Quarter selection: replaying a persisted snapshot and building the fresh
//! quarter of a cycle.
//!
//! Both paths order candidates the same way: masternodes unused by the three
//! previous quarters first, used ones after, each group sorted ascending by
//! score under the cycle's modifier. The skip list then records, over that
//! combined list, whichever of the two groups' positions is smaller, so a
//! verifier can cut the candidate list exactly as the builder did.

use std::collections::BTreeSet;

use crate::hash_types::{BlockHash, QuorumModifierHash};
use crate::llmq::params::LLMQParams;
use crate::llmq::snapshot::{QuorumSnapshot, SnapshotSkipMode};
use crate::sml::masternode_list::MasternodeList;
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// One member vector per active quorum index of a cycle.
pub type QuarterMembers = Vec<Vec<MasternodeListEntry>>;

/// Reproduces the quarter picked at a prior cycle base from its persisted
/// snapshot and the masternode list at that block.
///
/// The partition into used/unused follows the snapshot's bit vector over the
/// list's stable iteration order; the same order the builder used when it
/// wrote the bits.
pub fn quorum_quarter_members_from_snapshot(
    params: &LLMQParams,
    mn_list: &MasternodeList,
    work_block_hash: BlockHash,
    snapshot: &QuorumSnapshot,
) -> QuarterMembers {
    let num_quorums = params.signing_active_quorum_count as usize;
    let quarter_size = params.quarter_size();
    let modifier = QuorumModifierHash::for_block(params.quorum_type, work_block_hash);

    let mut used = Vec::new();
    let mut unused = Vec::new();
    let mut position = 0usize;
    mn_list.for_each(true, |mn| {
        if snapshot.member_is_used(position) {
            used.push(mn.clone());
        } else {
            unused.push(mn.clone());
        }
        position += 1;
    });

    let mut candidates = MasternodeList::order_by_quorum_score(unused, modifier);
    candidates.extend(MasternodeList::order_by_quorum_score(used, modifier));

    match snapshot.skip_list_mode {
        SnapshotSkipMode::NoSkipping => consume_quarters(candidates, num_quorums, quarter_size),
        SnapshotSkipMode::SkippingEntries => {
            let skipped = absolute_index_set(snapshot);
            let partitioned = stable_partition(candidates, |index| !skipped.contains(&index));
            consume_quarters(partitioned, num_quorums, quarter_size)
        }
        SnapshotSkipMode::NoSkippingEntries => {
            let kept = absolute_index_set(snapshot);
            let partitioned = stable_partition(candidates, |index| kept.contains(&index));
            consume_quarters(partitioned, num_quorums, quarter_size)
        }
        SnapshotSkipMode::AllSkipped => vec![Vec::new(); num_quorums],
    }
}

/// Reorders candidates so that positions satisfying the predicate come
/// first, preserving the original order inside both groups. Order
/// preservation is load-bearing: consumption happens from the front and
/// must see the builder's placement order.
fn stable_partition<F>(
    candidates: Vec<MasternodeListEntry>,
    mut front: F,
) -> Vec<MasternodeListEntry>
where
    F: FnMut(usize) -> bool,
{
    let (mut head, tail): (Vec<_>, Vec<_>) =
        candidates.into_iter().enumerate().partition(|(index, _)| front(*index));
    head.extend(tail);
    head.into_iter().map(|(_, mn)| mn).collect()
}

/// Builds the fresh quarters of the cycle anchored at `cycle_block_hash`,
/// along with the snapshot that makes the selection reproducible.
///
/// `previous_quarters` are the quarters of the three prior cycles, in the
/// order `[H−C, H−2C, H−3C]`; the union of their members is what "used"
/// means for this cycle.
pub fn build_new_quorum_quarter_members(
    params: &LLMQParams,
    mn_list: &MasternodeList,
    cycle_block_hash: BlockHash,
    previous_quarters: [&QuarterMembers; 3],
) -> (QuarterMembers, QuorumSnapshot) {
    let num_quorums = params.signing_active_quorum_count as usize;
    let quarter_size = params.quarter_size();
    let modifier = QuorumModifierHash::for_block(params.quorum_type, cycle_block_hash);

    let mut used_set = BTreeSet::new();
    let mut used_mns = Vec::new();
    for quarters in previous_quarters {
        for quarter in quarters.iter() {
            for mn in quarter {
                if used_set.insert(mn.pro_tx_hash) {
                    used_mns.push(mn.clone());
                }
            }
        }
    }
    let mut unused_mns = Vec::new();
    mn_list.for_each(true, |mn| {
        if !used_set.contains(&mn.pro_tx_hash) {
            unused_mns.push(mn.clone());
        }
    });

    // Bit per masternode in the list's stable order; set means used.
    let mut active_quorum_members = Vec::with_capacity(mn_list.count());
    mn_list.for_each(true, |mn| active_quorum_members.push(used_set.contains(&mn.pro_tx_hash)));

    let used_count = used_mns.len();
    let mut candidates = MasternodeList::order_by_quorum_score(unused_mns, modifier);
    candidates.extend(MasternodeList::order_by_quorum_score(used_mns, modifier));

    let needed = num_quorums * quarter_size;
    let mut quarters: QuarterMembers = vec![Vec::with_capacity(quarter_size); num_quorums];

    let (skip_list_mode, skip_list) = if used_count == 0 {
        if candidates.len() >= needed {
            for (position, mn) in candidates.into_iter().take(needed).enumerate() {
                quarters[position / quarter_size].push(mn);
            }
            (SnapshotSkipMode::NoSkipping, Vec::new())
        } else {
            // Not even a bootstrap cycle can be seeded from this few
            // masternodes.
            quarters = vec![Vec::new(); num_quorums];
            (SnapshotSkipMode::AllSkipped, Vec::new())
        }
    } else {
        // Record whichever group is smaller: skipped (used) positions under
        // mode 1, retained (unused) positions under mode 2.
        let record_skipped = used_count < candidates.len() / 2;
        let mut recorded = Vec::new();
        let mut placed = 0usize;
        for (index, mn) in candidates.iter().enumerate() {
            if used_set.contains(&mn.pro_tx_hash) {
                if record_skipped {
                    recorded.push(index as i32);
                }
            } else {
                if !record_skipped {
                    recorded.push(index as i32);
                }
                if placed < needed {
                    quarters[placed / quarter_size].push(mn.clone());
                    placed += 1;
                }
            }
        }
        if placed < needed {
            tracing::warn!(
                block_hash = %cycle_block_hash,
                placed,
                needed,
                "not enough unused masternodes to fill fresh quarters, cycle yields no new quorum"
            );
            quarters = vec![Vec::new(); num_quorums];
            (SnapshotSkipMode::AllSkipped, Vec::new())
        } else if record_skipped {
            (SnapshotSkipMode::SkippingEntries, QuorumSnapshot::differential_skip_list(&recorded))
        } else {
            (SnapshotSkipMode::NoSkippingEntries, QuorumSnapshot::differential_skip_list(&recorded))
        }
    };

    let snapshot = QuorumSnapshot { active_quorum_members, skip_list_mode, skip_list };
    (quarters, snapshot)
}

fn consume_quarters(
    candidates: Vec<MasternodeListEntry>,
    num_quorums: usize,
    quarter_size: usize,
) -> QuarterMembers {
    let mut quarters: QuarterMembers =
        candidates.chunks(quarter_size).take(num_quorums).map(<[_]>::to_vec).collect();
    quarters.resize_with(num_quorums, Vec::new);
    quarters
}

fn absolute_index_set(snapshot: &QuorumSnapshot) -> BTreeSet<usize> {
    snapshot
        .absolute_skip_list()
        .into_iter()
        .filter(|index| *index >= 0)
        .map(|index| index as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::serialize;
    use crate::llmq::params::{DKG_TEST, LLMQType};
    use crate::test_utils::{test_block_hash, test_entry};

    fn rotation_params(size: u32, signing_active_quorum_count: u32) -> LLMQParams {
        LLMQParams {
            quorum_type: LLMQType::LlmqtypeTestDIP0024,
            name: "llmq_test_dip0024",
            size,
            min_size: size * 3 / 4,
            threshold: size / 2,
            dkg_params: DKG_TEST,
            signing_active_quorum_count,
        }
    }

    fn list_of(count: u8) -> MasternodeList {
        MasternodeList::with_masternodes(test_block_hash(1), 100, (0..count).map(test_entry))
    }

    fn empty_quarters() -> QuarterMembers {
        Vec::new()
    }

    #[test]
    fn bootstrap_cycle_uses_mode_no_skipping() {
        let params = rotation_params(4, 1);
        let mn_list = list_of(8);
        let block = test_block_hash(42);
        let (empty_c, empty_2c, empty_3c) = (empty_quarters(), empty_quarters(), empty_quarters());

        let (quarters, snapshot) = build_new_quorum_quarter_members(
            &params,
            &mn_list,
            block,
            [&empty_c, &empty_2c, &empty_3c],
        );

        assert_eq!(snapshot.skip_list_mode, SnapshotSkipMode::NoSkipping);
        assert!(snapshot.skip_list.is_empty());
        assert_eq!(snapshot.active_quorum_members, vec![false; 8]);
        assert_eq!(quarters.len(), 1);
        assert_eq!(quarters[0].len(), 4);

        // The quarter is the prefix of the full deterministic ordering.
        let modifier = QuorumModifierHash::for_block(params.quorum_type, block);
        let ordered = mn_list.calculate_quorum(4, modifier);
        assert_eq!(quarters[0], ordered);
    }

    #[test]
    fn used_minority_records_skipped_entries() {
        let params = rotation_params(16, 1);
        let mn_list = list_of(12);
        let block = test_block_hash(7);
        let modifier = QuorumModifierHash::for_block(params.quorum_type, block);

        // Three of the twelve were members of a prior quarter.
        let prior: Vec<MasternodeListEntry> = mn_list.calculate_quorum(3, modifier);
        let prev = vec![prior.clone()];
        let (empty_2c, empty_3c) = (empty_quarters(), empty_quarters());

        let (quarters, snapshot) =
            build_new_quorum_quarter_members(&params, &mn_list, block, [&prev, &empty_2c, &empty_3c]);

        assert_eq!(snapshot.skip_list_mode, SnapshotSkipMode::SkippingEntries);
        // Used candidates sort behind the nine unused ones.
        assert_eq!(snapshot.absolute_skip_list(), vec![9, 10, 11]);
        assert_eq!(snapshot.skip_list, vec![9, -1, -2]);
        assert_eq!(snapshot.active_quorum_members.iter().filter(|b| **b).count(), 3);
        assert_eq!(quarters[0].len(), 4);
        for mn in &quarters[0] {
            assert!(!prior.iter().any(|used| used.pro_tx_hash == mn.pro_tx_hash));
        }
    }

    #[test]
    fn used_majority_records_retained_entries() {
        let params = rotation_params(8, 1);
        let mn_list = list_of(10);
        let block = test_block_hash(9);
        let modifier = QuorumModifierHash::for_block(params.quorum_type, block);

        // Six of ten used; 6 >= 10/2 selects mode 2.
        let prior = vec![mn_list.calculate_quorum(6, modifier)];
        let (empty_2c, empty_3c) = (empty_quarters(), empty_quarters());

        let (quarters, snapshot) =
            build_new_quorum_quarter_members(&params, &mn_list, block, [&prior, &empty_2c, &empty_3c]);

        assert_eq!(snapshot.skip_list_mode, SnapshotSkipMode::NoSkippingEntries);
        // The four unused candidates lead the combined list.
        assert_eq!(snapshot.absolute_skip_list(), vec![0, 1, 2, 3]);
        assert_eq!(quarters[0].len(), 2);
    }

    #[test]
    fn exhausted_candidates_yield_mode_all_skipped() {
        let params = rotation_params(4, 1);
        let mn_list = list_of(8);
        let block = test_block_hash(5);
        let modifier = QuorumModifierHash::for_block(params.quorum_type, block);

        // Every registered masternode sits in some prior quarter.
        let prior = vec![mn_list.calculate_quorum(8, modifier)];
        let (empty_2c, empty_3c) = (empty_quarters(), empty_quarters());

        let (quarters, snapshot) =
            build_new_quorum_quarter_members(&params, &mn_list, block, [&prior, &empty_2c, &empty_3c]);

        assert_eq!(snapshot.skip_list_mode, SnapshotSkipMode::AllSkipped);
        assert!(snapshot.skip_list.is_empty());
        assert_eq!(snapshot.active_quorum_members, vec![true; 8]);
        assert!(quarters.iter().all(Vec::is_empty));
    }

    #[test]
    fn replay_reproduces_built_quarters() {
        for (mn_count, used_count) in [(8u8, 0usize), (12, 3), (10, 6), (24, 10), (8, 8)] {
            let params = rotation_params(8, 2);
            let mn_list = list_of(mn_count);
            let block = test_block_hash(mn_count as u64);
            let modifier = QuorumModifierHash::for_block(params.quorum_type, block);
            let prior = vec![mn_list.calculate_quorum(used_count, modifier)];
            let (empty_2c, empty_3c) = (empty_quarters(), empty_quarters());

            let (built, snapshot) = build_new_quorum_quarter_members(
                &params,
                &mn_list,
                block,
                [&prior, &empty_2c, &empty_3c],
            );
            let replayed = quorum_quarter_members_from_snapshot(&params, &mn_list, block, &snapshot);
            assert_eq!(replayed, built, "mn_count={mn_count} used_count={used_count}");
        }
    }

    #[test]
    fn building_twice_is_byte_identical() {
        let params = rotation_params(8, 2);
        let mn_list = list_of(20);
        let block = test_block_hash(11);
        let modifier = QuorumModifierHash::for_block(params.quorum_type, block);
        let prior = vec![mn_list.calculate_quorum(5, modifier)];
        let (empty_2c, empty_3c) = (empty_quarters(), empty_quarters());

        let (first_quarters, first_snapshot) =
            build_new_quorum_quarter_members(&params, &mn_list, block, [&prior, &empty_2c, &empty_3c]);
        let (second_quarters, second_snapshot) =
            build_new_quorum_quarter_members(&params, &mn_list, block, [&prior, &empty_2c, &empty_3c]);

        assert_eq!(first_quarters, second_quarters);
        assert_eq!(serialize(&first_snapshot), serialize(&second_snapshot));
    }

    #[test]
    fn fresh_quarters_of_one_cycle_are_disjoint() {
        let params = rotation_params(8, 2);
        let mn_list = list_of(24);
        let block = test_block_hash(3);
        let (empty_c, empty_2c, empty_3c) = (empty_quarters(), empty_quarters(), empty_quarters());

        let (quarters, _) = build_new_quorum_quarter_members(
            &params,
            &mn_list,
            block,
            [&empty_c, &empty_2c, &empty_3c],
        );
        let mut seen = BTreeSet::new();
        for quarter in &quarters {
            assert_eq!(quarter.len(), 2);
            for mn in quarter {
                assert!(seen.insert(mn.pro_tx_hash), "duplicate across fresh quarters");
            }
        }
    }
}

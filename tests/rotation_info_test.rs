//! Rotation-info assembly and the light-client catch-up flow.

use std::sync::Arc;

use hashes::Hash;
use llmq_rotation::consensus::{deserialize, serialize};
use llmq_rotation::llmq::members::QuorumMemberManager;
use llmq_rotation::llmq::params::ConsensusParams;
use llmq_rotation::llmq::rotation::quorum_quarter_members_from_snapshot;
use llmq_rotation::llmq::rotation_info::{
    build_quorum_rotation_info, GetQuorumRotationInfo, QuorumRotationInfo,
};
use llmq_rotation::llmq::snapshot_manager::QuorumSnapshotManager;
use llmq_rotation::store::MemoryEvoDb;
use llmq_rotation::test_utils::{test_block_hash, test_entry, InMemoryChain};
use llmq_rotation::{ChainProvider, RotationError};

const CYCLE: u32 = 24;

struct Node {
    chain: Arc<InMemoryChain>,
    snapshots: Arc<QuorumSnapshotManager>,
    consensus: ConsensusParams,
}

/// A served-up node: chain with four mined rotation cycles, snapshots
/// persisted by running member selection at every cycle base.
fn serving_node() -> Node {
    let consensus = ConsensusParams::test();
    let llmq_type = consensus.llmq_type_dip0024;

    let mut chain = InMemoryChain::with_height(120);
    // The registry gains two masternodes late in the chain so list diffs
    // are non-trivial.
    chain.set_masternode_list_for_all((0..16).map(test_entry).collect());
    for height in 90..=120 {
        chain.set_masternode_list_at(height, (0..18).map(test_entry).collect());
    }
    for cycle_base in [24u32, 48, 72, 96] {
        chain.add_mined_commitment(llmq_type, cycle_base);
    }
    let chain = Arc::new(chain);

    let snapshots = Arc::new(QuorumSnapshotManager::new(Arc::new(MemoryEvoDb::new())));
    let manager = QuorumMemberManager::new(consensus.clone(), chain.clone(), snapshots.clone());
    let mut cycle_base = 0;
    while cycle_base <= 96 {
        manager.quorum_members(llmq_type, &chain.hash_at(cycle_base)).expect("warm up");
        cycle_base += CYCLE;
    }

    Node { chain, snapshots, consensus }
}

fn build(node: &Node, request: &GetQuorumRotationInfo) -> Result<QuorumRotationInfo, RotationError> {
    build_quorum_rotation_info(&*node.chain, &node.consensus, &node.snapshots, request)
}

#[test]
fn genesis_request_returns_three_snapshots_and_diffs() {
    let node = serving_node();
    let request = GetQuorumRotationInfo::new(vec![], node.chain.hash_at(100));

    let info = build(&node, &request).expect("rotation info");
    assert_eq!(info.creation_height, 96);

    // Diffs for H−C = 72, H−2C = 48, H−3C = 24, all based on genesis.
    assert_eq!(info.mn_list_diff_at_h_minus_c.block_hash, node.chain.hash_at(72));
    assert_eq!(info.mn_list_diff_at_h_minus_2c.block_hash, node.chain.hash_at(48));
    assert_eq!(info.mn_list_diff_at_h_minus_3c.block_hash, node.chain.hash_at(24));
    assert_eq!(info.mn_list_diff_tip.block_hash, node.chain.hash_at(120));

    // The snapshots are the stored ones.
    let llmq_type = node.consensus.llmq_type_dip0024;
    for (snapshot, height) in [
        (&info.quorum_snapshot_at_h_minus_c, 72u32),
        (&info.quorum_snapshot_at_h_minus_2c, 48),
        (&info.quorum_snapshot_at_h_minus_3c, 24),
    ] {
        let stored = node
            .snapshots
            .get(llmq_type, &node.chain.hash_at(height))
            .expect("store read")
            .expect("snapshot exists");
        assert_eq!(*snapshot, stored);
        assert!(!snapshot.active_quorum_members.is_empty());
    }
}

#[test]
fn light_client_replays_the_selection_from_the_response() {
    let node = serving_node();
    let llmq_type = node.consensus.llmq_type_dip0024;
    let params = node.consensus.params(llmq_type).expect("params").clone();
    let request = GetQuorumRotationInfo::new(vec![], node.chain.hash_at(100));
    let info = build(&node, &request).expect("rotation info");

    // The client starts from the genesis list and applies the H−3C diff.
    let genesis_hash = node.chain.genesis().expect("genesis").hash;
    let genesis_list = node.chain.masternode_list_at(&genesis_hash).expect("genesis list");
    let client_list =
        genesis_list.apply_diff(&info.mn_list_diff_at_h_minus_3c, 24).expect("apply diff");

    // Replaying the snapshot over the reconstructed list matches the
    // server's own replay.
    let server_list = node.chain.masternode_list_at(&node.chain.hash_at(24)).expect("list");
    assert_eq!(client_list, *server_list);
    let client_quarters = quorum_quarter_members_from_snapshot(
        &params,
        &client_list,
        node.chain.hash_at(24),
        &info.quorum_snapshot_at_h_minus_3c,
    );
    let server_quarters = quorum_quarter_members_from_snapshot(
        &params,
        &server_list,
        node.chain.hash_at(24),
        &info.quorum_snapshot_at_h_minus_3c,
    );
    assert_eq!(client_quarters, server_quarters);
    assert!(client_quarters.iter().all(|quarter| quarter.len() == params.quarter_size()));
}

#[test]
fn known_bases_shrink_the_diffs() {
    let node = serving_node();
    // The client already knows the list at height 48.
    let request =
        GetQuorumRotationInfo::new(vec![node.chain.hash_at(48)], node.chain.hash_at(100));
    let info = build(&node, &request).expect("rotation info");

    // H−C = 72 diffs against the client's base at 48.
    assert_eq!(info.mn_list_diff_at_h_minus_c.base_block_hash, node.chain.hash_at(48));
    // H−3C = 24 precedes every base; its diff starts from scratch.
    assert_eq!(
        info.mn_list_diff_at_h_minus_3c.base_block_hash,
        llmq_rotation::BlockHash::all_zeros()
    );
    // The tip diff is based on the highest base.
    assert_eq!(info.mn_list_diff_tip.base_block_hash, node.chain.hash_at(48));
}

#[test]
fn too_many_or_inconsistent_bases_are_bad_requests() {
    let node = serving_node();

    let hashes: Vec<_> = (0..5u32).map(|height| node.chain.hash_at(height)).collect();
    let request = GetQuorumRotationInfo::new(hashes, node.chain.hash_at(100));
    assert!(matches!(build(&node, &request), Err(RotationError::BadRequest(_))));

    let mut request =
        GetQuorumRotationInfo::new(vec![node.chain.hash_at(24)], node.chain.hash_at(100));
    request.base_block_hashes_nb = 2;
    assert!(matches!(build(&node, &request), Err(RotationError::BadRequest(_))));
}

#[test]
fn unknown_base_blocks_are_not_found() {
    let node = serving_node();
    let request =
        GetQuorumRotationInfo::new(vec![test_block_hash(0xDEAD)], node.chain.hash_at(100));
    assert!(matches!(build(&node, &request), Err(RotationError::BlockNotFound(_))));
}

#[test]
fn fewer_than_four_commitments_is_no_quorum() {
    let node = serving_node();
    // Request early enough that only two commitments precede it.
    let request = GetQuorumRotationInfo::new(vec![], node.chain.hash_at(50));
    match build(&node, &request) {
        Err(RotationError::NoQuorum { required, found, .. }) => {
            assert_eq!(required, 4);
            assert_eq!(found, 2);
        }
        other => panic!("expected NoQuorum, got {other:?}"),
    }
}

#[test]
fn missing_snapshot_is_reported() {
    let node = serving_node();
    // An empty snapshot store: commitments resolve but snapshots are gone.
    let empty_store = Arc::new(QuorumSnapshotManager::new(Arc::new(MemoryEvoDb::new())));
    let request = GetQuorumRotationInfo::new(vec![], node.chain.hash_at(100));
    let result =
        build_quorum_rotation_info(&*node.chain, &node.consensus, &empty_store, &request);
    assert!(matches!(result, Err(RotationError::SnapshotNotPresent(_))));
}

#[test]
fn response_wire_round_trip() {
    let node = serving_node();
    let request = GetQuorumRotationInfo::new(vec![], node.chain.hash_at(100));
    let info = build(&node, &request).expect("rotation info");

    let encoded = serialize(&info);
    // creation_height leads the stream as a 4-byte LE signed integer.
    assert_eq!(&encoded[..4], &96i32.to_le_bytes());
    let decoded: QuorumRotationInfo = deserialize(&encoded).expect("decode");
    assert_eq!(decoded, info);
}

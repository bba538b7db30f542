//! Deterministic intra-quorum connection sets.
//!
//! Members agree on who dials whom without negotiation: every pairwise
//! direction and every relay neighbourhood is derived from hashes of the
//! participants' identities, so both ends compute the same answer.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use hashes::{sha256d, Hash};

use crate::hash_types::{BlockHash, ProTxHash};
use crate::llmq::params::LLMQType;
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// Decides which of two quorum members initiates the connection between
/// them. Comparing the raw hashes would bias toward numerically low
/// identities, so both candidates are re-hashed together with the ordered
/// pair first.
pub fn deterministic_outbound_connection(
    pro_tx_hash_1: ProTxHash,
    pro_tx_hash_2: ProTxHash,
) -> ProTxHash {
    let (low, high) = if pro_tx_hash_1 < pro_tx_hash_2 {
        (pro_tx_hash_1, pro_tx_hash_2)
    } else {
        (pro_tx_hash_2, pro_tx_hash_1)
    };
    let h1 = pair_member_hash(low, high, pro_tx_hash_1);
    let h2 = pair_member_hash(low, high, pro_tx_hash_2);
    if h1 < h2 {
        pro_tx_hash_1
    } else {
        pro_tx_hash_2
    }
}

fn pair_member_hash(low: ProTxHash, high: ProTxHash, member: ProTxHash) -> sha256d::Hash {
    let mut buf = [0u8; 96];
    buf[..32].copy_from_slice(&low.to_byte_array());
    buf[32..64].copy_from_slice(&high.to_byte_array());
    buf[64..].copy_from_slice(&member.to_byte_array());
    sha256d::Hash::hash(&buf)
}

/// The relay neighbourhood of `for_member` inside an ordered member list:
/// the members at ring offsets `(i + 2^k) mod n`. With `only_outbound`
/// false, members whose own neighbourhood contains `for_member` are included
/// as well.
pub fn quorum_relay_members(
    members: &[MasternodeListEntry],
    for_member: &ProTxHash,
    only_outbound: bool,
) -> BTreeSet<ProTxHash> {
    let mut result = BTreeSet::new();
    for (position, member) in members.iter().enumerate() {
        if member.pro_tx_hash == *for_member {
            result.extend(ring_outbound(members, position, for_member));
        } else if !only_outbound {
            let reaches_us = ring_outbound(members, position, &member.pro_tx_hash);
            if reaches_us.contains(for_member) {
                result.insert(member.pro_tx_hash);
            }
        }
    }
    result
}

fn ring_outbound(
    members: &[MasternodeListEntry],
    position: usize,
    pro_tx_hash: &ProTxHash,
) -> BTreeSet<ProTxHash> {
    let mut result = BTreeSet::new();
    if members.len() < 2 {
        return result;
    }
    // Relay to members at offsets (position + 2^k) % n for
    // k in 0..max(2, floor(log2(n - 1))).
    let mut gap: usize = 1;
    let mut gap_max = members.len() - 1;
    let mut k = 0;
    loop {
        gap_max >>= 1;
        if gap_max == 0 && k > 1 {
            break;
        }
        let index = (position + gap) % members.len();
        let other = &members[index];
        if other.pro_tx_hash != *pro_tx_hash {
            result.insert(other.pro_tx_hash);
            k += 1;
        } else if gap_max == 0 {
            // The ring has wrapped back onto ourselves.
            break;
        }
        gap <<= 1;
    }
    result
}

static WATCH_CONNECTION_SEED: OnceLock<[u8; 32]> = OnceLock::new();

/// Member positions a non-member node watching this quorum should connect
/// to. The walk is seeded by a process-wide random value initialized once,
/// so a watcher keeps the same sampled connections for its lifetime without
/// being predictable across processes.
pub fn watch_connections(
    llmq_type: LLMQType,
    quorum_block_hash: &BlockHash,
    member_count: usize,
    connection_count: usize,
) -> BTreeSet<usize> {
    let mut result = BTreeSet::new();
    if member_count == 0 {
        return result;
    }
    let seed = WATCH_CONNECTION_SEED.get_or_init(rand::random);

    let mut rnd = sha256d::Hash::from_byte_array(*seed);
    for _ in 0..connection_count {
        let mut buf = [0u8; 65];
        buf[..32].copy_from_slice(&rnd.to_byte_array());
        buf[32] = u8::from(llmq_type);
        buf[33..].copy_from_slice(&quorum_block_hash.to_byte_array());
        rnd = sha256d::Hash::hash(&buf);

        let word = u64::from_le_bytes(
            rnd.to_byte_array()[..8].try_into().expect("eight bytes"),
        );
        result.insert((word % member_count as u64) as usize);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_block_hash, test_entry};

    #[test]
    fn outbound_choice_is_symmetric_and_deterministic() {
        let a = test_entry(1).pro_tx_hash;
        let b = test_entry(2).pro_tx_hash;
        let chosen = deterministic_outbound_connection(a, b);
        assert!(chosen == a || chosen == b);
        assert_eq!(chosen, deterministic_outbound_connection(b, a));
    }

    #[test]
    fn relay_ring_hits_power_of_two_offsets() {
        let members: Vec<MasternodeListEntry> = (0..16).map(test_entry).collect();
        let outbound = quorum_relay_members(&members, &members[3].pro_tx_hash, true);
        let expected: BTreeSet<ProTxHash> =
            [4usize, 5, 7].iter().map(|i| members[*i].pro_tx_hash).collect();
        assert_eq!(outbound, expected);

        // Eight members: the gap cap halves to zero after two steps.
        let small: Vec<MasternodeListEntry> = (0..8).map(test_entry).collect();
        let outbound = quorum_relay_members(&small, &small[0].pro_tx_hash, true);
        let expected: BTreeSet<ProTxHash> =
            [1usize, 2].iter().map(|i| small[*i].pro_tx_hash).collect();
        assert_eq!(outbound, expected);
    }

    #[test]
    fn relay_members_include_inbound_when_asked() {
        let members: Vec<MasternodeListEntry> = (0..8).map(test_entry).collect();
        let me = members[0].pro_tx_hash;
        let all = quorum_relay_members(&members, &me, false);
        // Everyone whose ring contains us, plus our own ring.
        for member in &members {
            if member.pro_tx_hash == me {
                continue;
            }
            let their_ring = quorum_relay_members(&members, &member.pro_tx_hash, true);
            if their_ring.contains(&me) {
                assert!(all.contains(&member.pro_tx_hash));
            }
        }
        assert!(all.is_superset(&quorum_relay_members(&members, &me, true)));
    }

    #[test]
    fn watch_connections_are_stable_within_a_process() {
        let block = test_block_hash(4);
        let first = watch_connections(LLMQType::LlmqtypeTestDIP0024, &block, 10, 2);
        let second = watch_connections(LLMQType::LlmqtypeTestDIP0024, &block, 10, 2);
        assert_eq!(first, second);
        assert!(!first.is_empty());
        assert!(first.iter().all(|index| *index < 10));
    }
}

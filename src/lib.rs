//! Long-living masternode quorum (LLMQ) rotation.
//!
//! This library implements the deterministic core of quarter-based quorum
//! rotation for a masternode network:
//!
//! - Pick the members of a rotated quorum by reusing three quarters from the
//!   three previous cycles and building one fresh quarter
//! - Persist a compact per-cycle snapshot that lets any verifier reproduce a
//!   prior selection bit-for-bit from chain state
//! - Assemble the rotation info (snapshots plus masternode-list diffs) a
//!   light client needs to catch up to a given block
//!
//! Determinism is the consensus-critical property throughout: every honest
//! node running the same inputs must arrive at byte-identical snapshots and
//! identical member vectors. The only source of randomness in selection is a
//! cryptographic hash of the quorum type and the cycle's block hash.
//!
//! Chain access, the masternode registry and the key/value store are
//! consumed through the interfaces in [`chain`] and [`store`]; nothing in
//! the core walks headers or performs network IO.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use llmq_rotation::llmq::members::QuorumMemberManager;
//! use llmq_rotation::llmq::params::ConsensusParams;
//! use llmq_rotation::llmq::snapshot_manager::QuorumSnapshotManager;
//! use llmq_rotation::store::MemoryEvoDb;
//! use llmq_rotation::test_utils::{test_entry, InMemoryChain};
//!
//! let consensus = ConsensusParams::test();
//! let llmq_type = consensus.llmq_type_dip0024;
//!
//! let mut chain = InMemoryChain::with_height(96);
//! chain.set_masternode_list_for_all((0..16).map(test_entry).collect());
//!
//! let snapshots = Arc::new(QuorumSnapshotManager::new(Arc::new(MemoryEvoDb::new())));
//! let manager = QuorumMemberManager::new(consensus, Arc::new(chain), snapshots);
//!
//! // Every cycle persists its snapshot; after three cycles of history the
//! // concatenation of four quarters forms a complete quorum.
//! for cycle_base in [0u64, 24, 48, 72, 96] {
//!     let block_hash = llmq_rotation::test_utils::test_block_hash(cycle_base);
//!     let _ = manager.quorum_members(llmq_type, &block_hash).expect("resolve members");
//! }
//! let members = manager.quorum_members(llmq_type, &llmq_rotation::test_utils::test_block_hash(96))
//!     .expect("resolve members");
//! assert_eq!(members.len(), 4);
//! ```

pub mod chain;
pub mod consensus;
pub mod error;
pub mod hash_types;
mod internal_macros;
pub mod llmq;
pub mod sml;
pub mod store;
pub mod test_utils;

/// A height on the core chain.
pub type CoreBlockHeight = u32;

pub use chain::{BlockInfo, ChainProvider};
pub use error::RotationError;
pub use hash_types::{BlockHash, ProTxHash, QuorumModifierHash, ScoreHash};
pub use llmq::params::{ConsensusParams, LLMQParams, LLMQType};
pub use llmq::snapshot::{QuorumSnapshot, SnapshotSkipMode};
pub use sml::masternode_list::MasternodeList;
pub use sml::masternode_list_entry::MasternodeListEntry;

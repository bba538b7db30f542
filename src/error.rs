//! Error types surfaced to callers of the rotation subsystem.

use thiserror::Error;

use crate::consensus::encode;
use crate::hash_types::BlockHash;
use crate::llmq::params::LLMQType;
use crate::CoreBlockHeight;

/// Errors produced by quorum member selection, snapshot handling and
/// rotation-info assembly.
///
/// All errors carry a human-readable reason and propagate to the caller
/// without retries. Violated internal preconditions (such as a quorum size
/// not divisible by four) are bugs and abort via assertion instead.
#[derive(Debug, Error)]
pub enum RotationError {
    /// The request itself is malformed (inconsistent counts, too many base
    /// block hashes).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A block hash could not be resolved in the index.
    #[error("block {0} not found")]
    BlockNotFound(BlockHash),

    /// A block is known but not part of the active chain.
    #[error("block {0} is not in the active chain")]
    BlockNotInActiveChain(BlockHash),

    /// A required height has no block on the active chain.
    #[error("no block at height {0}")]
    BlockHeightNotFound(CoreBlockHeight),

    /// The chain tip could not be resolved.
    #[error("tip block not found")]
    TipNotFound,

    /// The genesis block could not be resolved.
    #[error("genesis block not found")]
    GenesisNotFound,

    /// No masternode list is available for a required block.
    #[error("masternode list not present for block {0}")]
    MasternodeListNotPresent(BlockHash),

    /// Fewer mined commitments of the rotating type precede the request
    /// block than the rotation needs.
    #[error("not enough mined commitments for quorum type {llmq_type}: required {required}, found {found}")]
    NoQuorum { llmq_type: LLMQType, required: usize, found: usize },

    /// A required prior-cycle snapshot is absent from the store.
    #[error("quorum snapshot not present for block {0}")]
    SnapshotNotPresent(BlockHash),

    /// A snapshot failed to decode (truncated stream, bad skip mode).
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] encode::Error),

    /// The quorum type is not part of the consensus parameter map.
    #[error("unknown quorum type {0}")]
    UnknownQuorumType(LLMQType),

    /// A masternode-list diff was applied against the wrong base list.
    #[error("diff base block {got} does not match list block {expected}")]
    DiffBaseMismatch { expected: BlockHash, got: BlockHash },
}

//! Quorum type identifiers and their consensus parameters.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::io;

use crate::consensus::{encode, Decodable, Encodable};
use crate::CoreBlockHeight;

/// Parameters of a DKG session schedule. `interval` is the rotation period:
/// the number of blocks between successive cycle base blocks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Hash, Ord)]
pub struct DKGParams {
    pub interval: u32,
    pub phase_blocks: u32,
    pub mining_window_start: u32,
    pub mining_window_end: u32,
}

/// Read-only parameters of one quorum type.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Hash, Ord)]
pub struct LLMQParams {
    pub quorum_type: LLMQType,
    pub name: &'static str,
    pub size: u32,
    pub min_size: u32,
    pub threshold: u32,
    pub dkg_params: DKGParams,
    pub signing_active_quorum_count: u32,
}

impl LLMQParams {
    /// Members per quarter. Rotated quorum sizes are divisible by four;
    /// anything else is a configuration bug.
    pub fn quarter_size(&self) -> usize {
        assert!(self.size % 4 == 0, "rotated quorum size must be divisible by 4");
        (self.size / 4) as usize
    }
}

pub const DKG_60_75: DKGParams = DKGParams {
    interval: 24 * 12,
    phase_blocks: 2,
    mining_window_start: 42,
    mining_window_end: 50,
};

pub const DKG_50_60: DKGParams = DKGParams {
    interval: 24,
    phase_blocks: 2,
    mining_window_start: 10,
    mining_window_end: 18,
};

pub const DKG_400_60: DKGParams = DKGParams {
    interval: 24 * 12,
    phase_blocks: 4,
    mining_window_start: 20,
    mining_window_end: 28,
};

pub const DKG_400_85: DKGParams = DKGParams {
    interval: 24 * 24,
    phase_blocks: 4,
    mining_window_start: 20,
    mining_window_end: 48,
};

pub const DKG_100_67: DKGParams = DKGParams {
    interval: 24,
    phase_blocks: 2,
    mining_window_start: 10,
    mining_window_end: 18,
};

pub const DKG_TEST: DKGParams = DKGParams {
    interval: 24,
    phase_blocks: 2,
    mining_window_start: 10,
    mining_window_end: 18,
};

pub const DKG_DEVNET_DIP_0024: DKGParams = DKGParams {
    interval: 48,
    phase_blocks: 2,
    mining_window_start: 10,
    mining_window_end: 18,
};

pub const LLMQ_50_60: LLMQParams = LLMQParams {
    quorum_type: LLMQType::Llmqtype50_60,
    name: "llmq_50_60",
    size: 50,
    min_size: 40,
    threshold: 30,
    dkg_params: DKG_50_60,
    signing_active_quorum_count: 24,
};

pub const LLMQ_400_60: LLMQParams = LLMQParams {
    quorum_type: LLMQType::Llmqtype400_60,
    name: "llmq_400_60",
    size: 400,
    min_size: 300,
    threshold: 240,
    dkg_params: DKG_400_60,
    signing_active_quorum_count: 4,
};

pub const LLMQ_400_85: LLMQParams = LLMQParams {
    quorum_type: LLMQType::Llmqtype400_85,
    name: "llmq_400_85",
    size: 400,
    min_size: 350,
    threshold: 340,
    dkg_params: DKG_400_85,
    signing_active_quorum_count: 4,
};

pub const LLMQ_100_67: LLMQParams = LLMQParams {
    quorum_type: LLMQType::Llmqtype100_67,
    name: "llmq_100_67",
    size: 100,
    min_size: 80,
    threshold: 67,
    dkg_params: DKG_100_67,
    signing_active_quorum_count: 24,
};

/// The rotating InstantSend quorum introduced by DIP0024.
pub const LLMQ_60_75: LLMQParams = LLMQParams {
    quorum_type: LLMQType::Llmqtype60_75,
    name: "llmq_60_75",
    size: 60,
    min_size: 50,
    threshold: 45,
    dkg_params: DKG_60_75,
    signing_active_quorum_count: 32,
};

pub const LLMQ_TEST_DIP0024: LLMQParams = LLMQParams {
    quorum_type: LLMQType::LlmqtypeTestDIP0024,
    name: "llmq_test_dip0024",
    size: 4,
    min_size: 3,
    threshold: 2,
    dkg_params: DKG_TEST,
    signing_active_quorum_count: 2,
};

pub const LLMQ_DEVNET_DIP0024: LLMQParams = LLMQParams {
    quorum_type: LLMQType::LlmqtypeDevnetDIP0024,
    name: "llmq_devnet_dip0024",
    size: 8,
    min_size: 6,
    threshold: 4,
    dkg_params: DKG_DEVNET_DIP_0024,
    signing_active_quorum_count: 2,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Hash, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LLMQType {
    LlmqtypeUnknown = 0,
    Llmqtype50_60 = 1,
    Llmqtype400_60 = 2,
    Llmqtype400_85 = 3,
    Llmqtype100_67 = 4,
    Llmqtype60_75 = 5,

    // dev-only
    LlmqtypeTestDIP0024 = 103,
    LlmqtypeDevnetDIP0024 = 105,
}

impl Display for LLMQType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LLMQType::LlmqtypeUnknown => "0_Unknown",
                LLMQType::Llmqtype50_60 => "1_50/60",
                LLMQType::Llmqtype400_60 => "2_400/60",
                LLMQType::Llmqtype400_85 => "3_400/85",
                LLMQType::Llmqtype100_67 => "4_100/67",
                LLMQType::Llmqtype60_75 => "5_60/75",
                LLMQType::LlmqtypeTestDIP0024 => "103_Test-dip-24",
                LLMQType::LlmqtypeDevnetDIP0024 => "105_Dev-dip-24",
            }
        )
    }
}

impl From<u8> for LLMQType {
    fn from(orig: u8) -> Self {
        match orig {
            1 => LLMQType::Llmqtype50_60,
            2 => LLMQType::Llmqtype400_60,
            3 => LLMQType::Llmqtype400_85,
            4 => LLMQType::Llmqtype100_67,
            5 => LLMQType::Llmqtype60_75,
            103 => LLMQType::LlmqtypeTestDIP0024,
            105 => LLMQType::LlmqtypeDevnetDIP0024,
            _ => LLMQType::LlmqtypeUnknown,
        }
    }
}

impl From<LLMQType> for u8 {
    fn from(value: LLMQType) -> Self {
        match value {
            LLMQType::LlmqtypeUnknown => 0,
            LLMQType::Llmqtype50_60 => 1,
            LLMQType::Llmqtype400_60 => 2,
            LLMQType::Llmqtype400_85 => 3,
            LLMQType::Llmqtype100_67 => 4,
            LLMQType::Llmqtype60_75 => 5,
            LLMQType::LlmqtypeTestDIP0024 => 103,
            LLMQType::LlmqtypeDevnetDIP0024 => 105,
        }
    }
}

impl Encodable for LLMQType {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        u8::from(*self).consensus_encode(w)
    }
}

impl Decodable for LLMQType {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<LLMQType, encode::Error> {
        u8::consensus_decode(r).map(LLMQType::from)
    }
}

/// Consensus-level configuration: the quorum parameter map plus the knobs
/// that decide where quarter rotation is active.
#[derive(Clone, Debug)]
pub struct ConsensusParams {
    pub llmqs: BTreeMap<LLMQType, LLMQParams>,
    /// Height at which DIP0024 quarter rotation activates.
    pub dip0024_height: CoreBlockHeight,
    /// The quorum type that rotates by quarters (InstantSend under DIP0024).
    pub llmq_type_dip0024: LLMQType,
}

impl ConsensusParams {
    pub fn mainnet() -> Self {
        let llmqs = [LLMQ_50_60, LLMQ_400_60, LLMQ_400_85, LLMQ_100_67, LLMQ_60_75]
            .into_iter()
            .map(|params| (params.quorum_type, params))
            .collect();
        ConsensusParams {
            llmqs,
            dip0024_height: 1_737_792,
            llmq_type_dip0024: LLMQType::Llmqtype60_75,
        }
    }

    pub fn devnet() -> Self {
        let llmqs = [LLMQ_50_60, LLMQ_DEVNET_DIP0024]
            .into_iter()
            .map(|params| (params.quorum_type, params))
            .collect();
        ConsensusParams {
            llmqs,
            dip0024_height: 0,
            llmq_type_dip0024: LLMQType::LlmqtypeDevnetDIP0024,
        }
    }

    /// A small configuration for functional tests: four-member rotated
    /// quorums active from genesis.
    pub fn test() -> Self {
        let llmqs = [LLMQ_TEST_DIP0024]
            .into_iter()
            .map(|params| (params.quorum_type, params))
            .collect();
        ConsensusParams {
            llmqs,
            dip0024_height: 0,
            llmq_type_dip0024: LLMQType::LlmqtypeTestDIP0024,
        }
    }

    /// Parameters of a configured quorum type.
    pub fn params(&self, llmq_type: LLMQType) -> Result<&LLMQParams, crate::RotationError> {
        self.llmqs.get(&llmq_type).ok_or(crate::RotationError::UnknownQuorumType(llmq_type))
    }

    /// Whether quarter rotation governs `llmq_type` at `height`.
    pub fn rotation_active(&self, llmq_type: LLMQType, height: CoreBlockHeight) -> bool {
        llmq_type == self.llmq_type_dip0024 && height >= self.dip0024_height
    }
}

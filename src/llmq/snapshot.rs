//! The persisted cycle snapshot and its wire codec.
//!
//! A snapshot records, for one cycle base block, which masternodes were
//! already "used" by the three previous quarters and what skip strategy the
//! new-quarter builder applied to the ordered candidate list. Together with
//! the masternode list at that block it deterministically reproduces the
//! quarter picked there.

use std::fmt::{Display, Formatter};
use std::io;

use crate::consensus::encode::{
    read_compact_size, read_fixed_bitset, write_fixed_bitset, Error,
};
use crate::consensus::{Decodable, Encodable};

/// How the new-quarter builder walked the candidate list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum SnapshotSkipMode {
    /// Mode 0: no candidate was skipped; the skip list is empty.
    NoSkipping = 0,
    /// Mode 1: the skip list holds the indices of skipped (used) candidates.
    SkippingEntries = 1,
    /// Mode 2: the skip list holds the indices of retained candidates.
    NoSkippingEntries = 2,
    /// Mode 3: the walk exhausted the candidates; the cycle produced no new
    /// quarter and the skip list is empty.
    AllSkipped = 3,
}

impl Default for SnapshotSkipMode {
    fn default() -> Self {
        SnapshotSkipMode::NoSkipping
    }
}

impl Encodable for SnapshotSkipMode {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        (*self as i32).consensus_encode(w)
    }
}

impl Decodable for SnapshotSkipMode {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        match i32::consensus_decode(r)? {
            0 => Ok(SnapshotSkipMode::NoSkipping),
            1 => Ok(SnapshotSkipMode::SkippingEntries),
            2 => Ok(SnapshotSkipMode::NoSkippingEntries),
            3 => Ok(SnapshotSkipMode::AllSkipped),
            _ => Err(Error::ParseFailed("invalid snapshot skip list mode")),
        }
    }
}

/// Snapshot of one cycle's selection inputs.
///
/// `active_quorum_members` has one bit per masternode in the list at the
/// snapshot's block, in the list's stable iteration order; a set bit marks a
/// masternode used by one of the three previous quarters. The skip list is
/// differentially encoded: the first entry is an absolute candidate index,
/// every later entry is `first − index`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuorumSnapshot {
    pub active_quorum_members: Vec<bool>,
    pub skip_list_mode: SnapshotSkipMode,
    pub skip_list: Vec<i32>,
}

impl Encodable for QuorumSnapshot {
    fn consensus_encode<W: io::Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = self.skip_list_mode.consensus_encode(w)?;
        len += write_fixed_bitset(w, &self.active_quorum_members, self.active_quorum_members.len())?;
        len += self.skip_list.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for QuorumSnapshot {
    fn consensus_decode<R: io::Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let skip_list_mode = SnapshotSkipMode::consensus_decode(r)?;
        let member_count = read_compact_size(r)?;
        let active_quorum_members = read_fixed_bitset(r, member_count as usize)?;
        let skip_list = Vec::consensus_decode(r)?;
        Ok(QuorumSnapshot { active_quorum_members, skip_list_mode, skip_list })
    }
}

impl Display for QuorumSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut packed = vec![0u8; (self.active_quorum_members.len() + 7) / 8];
        for (i, bit) in self.active_quorum_members.iter().enumerate() {
            if *bit {
                packed[i / 8] |= 1 << (i % 8);
            }
        }
        let skip_list = self.skip_list.iter().fold(String::new(), |mut acc, entry| {
            acc.push_str(&format!("{entry},"));
            acc
        });
        write!(f, "members: {} {:?} [{}]", hex::encode(&packed), self.skip_list_mode, skip_list)
    }
}

impl QuorumSnapshot {
    /// Whether the masternode at the given list position was used.
    pub fn member_is_used(&self, index: usize) -> bool {
        self.active_quorum_members.get(index).copied().unwrap_or(false)
    }

    /// Turns absolute skip indices into the differential wire form.
    pub fn differential_skip_list(absolute: &[i32]) -> Vec<i32> {
        match absolute.split_first() {
            None => Vec::new(),
            Some((first, rest)) => {
                let mut list = Vec::with_capacity(absolute.len());
                list.push(*first);
                list.extend(rest.iter().map(|index| *first - *index));
                list
            }
        }
    }

    /// Reconstructs absolute candidate indices from the differential wire
    /// form.
    pub fn absolute_skip_list(&self) -> Vec<i32> {
        match self.skip_list.split_first() {
            None => Vec::new(),
            Some((first, rest)) => {
                let mut absolute = Vec::with_capacity(self.skip_list.len());
                absolute.push(*first);
                absolute.extend(rest.iter().map(|delta| *first - *delta));
                absolute
            }
        }
    }
}

//! Consensus-critical serialization.
//!
//! Everything persisted to the snapshot store or sent on the wire goes
//! through the encoding in this module. The format is the Bitcoin-style
//! little-endian encoding with compact-size length prefixes; changing any of
//! it is a hard fork.

pub mod encode;

pub use encode::{deserialize, serialize, Decodable, Encodable};

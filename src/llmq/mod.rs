//! Long-living masternode quorums: parameters, cycle snapshots, the
//! quarter-rotation scheduler and rotation-info assembly.

pub mod connections;
pub mod members;
pub mod params;
pub mod rotation;
pub mod rotation_info;
pub mod snapshot;
pub mod snapshot_manager;

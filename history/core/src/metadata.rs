use crate::BlockLevel;
use chainstore_hashes::Hash;
use serde::{Deserialize, Serialize};

/// Metadata attached to an applied block. Everything here is a
/// deterministic function of the block and the chain parameters, which is
/// what makes pruned metadata reconstructible by replaying the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub hash: Hash,
    pub level: BlockLevel,
    pub baker: String,
    /// Cycle the level belongs to; genesis belongs to no cycle
    pub cycle: Option<u64>,
    /// Zero-based position of the level within its cycle
    pub cycle_position: Option<u64>,
    pub operation_count: u64,
    pub gas_used: u64,
}

use crate::BlockLevel;
use chainstore_hashes::{BlockHasher, Hash};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub hash: Hash, // Cached hash of the remaining fields
    pub level: BlockLevel,
    pub parent: Hash,
    pub baker: String,
    pub timestamp: u64,
}

impl Header {
    pub fn new(level: BlockLevel, parent: Hash, baker: String, timestamp: u64) -> Self {
        let mut hasher = BlockHasher::new();
        hasher.update_u64(level).update(parent).update_var_bytes(baker.as_bytes()).update_u64(timestamp);
        Self { hash: hasher.finalize(), level, parent, baker, timestamp }
    }

    /// Recomputes the hash from the remaining fields, for integrity checks
    /// on headers read from untrusted artifacts
    pub fn computed_hash(&self) -> Hash {
        let mut hasher = BlockHasher::new();
        hasher.update_u64(self.level).update(self.parent).update_var_bytes(self.baker.as_bytes()).update_u64(self.timestamp);
        hasher.finalize()
    }
}

/// An operation carried by a block. The payload is opaque to the storage
/// layer; it is persisted, snapshotted and replayed byte-for-byte.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: String,
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub operations: Vec<Operation>,
}

impl Block {
    pub fn new(header: Header, operations: Vec<Operation>) -> Self {
        Self { header, operations }
    }

    pub fn from_header(header: Header) -> Self {
        Self { header, operations: Vec::new() }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash
    }

    pub fn level(&self) -> BlockLevel {
        self.header.level
    }

    /// Builds the successor block of `parent`, using the minimal-timestamp
    /// policy (parent timestamp + 1) so that identically-baked chains are
    /// byte-identical across nodes.
    pub fn child_of(parent: &Header, baker: String, operations: Vec<Operation>) -> Self {
        Self::new(Header::new(parent.level + 1, parent.hash, baker, parent.timestamp + 1), operations)
    }
}

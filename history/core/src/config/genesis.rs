use crate::block::{Block, Header};
use chainstore_hashes::ZERO_HASH;

/// Template from which every node builds the identical genesis block.
/// All fields are constants so the genesis hash is network-wide stable.
#[derive(Clone, Debug)]
pub struct GenesisBlock {
    pub baker: &'static str,
    pub timestamp: u64,
}

impl GenesisBlock {
    pub fn build_header(&self) -> Header {
        Header::new(0, ZERO_HASH, self.baker.to_string(), self.timestamp)
    }

    pub fn build_block(&self) -> Block {
        Block::from_header(self.build_header())
    }
}

pub const GENESIS: GenesisBlock = GenesisBlock { baker: "genesis", timestamp: 0 };

use super::LevelKey;
use chainstore_database::prelude::{CachedDbAccess, DbWriter, StoreResult, DB};
use chainstore_history_core::{block::Block, BlockLevel};
use std::sync::Arc;

/// Reader API for `BlockStore`. Access is raw: availability gating against
/// the retention pointers happens at the facade, not here, since
/// reconstruction and snapshot export read through this API below the caboose.
pub trait BlockStoreReader {
    fn has(&self, level: BlockLevel) -> StoreResult<bool>;
    fn get(&self, level: BlockLevel) -> StoreResult<Arc<Block>>;
}

pub trait BlockStore: BlockStoreReader {
    // This store is append only
    fn insert(&self, writer: impl DbWriter, block: Arc<Block>) -> StoreResult<()>;
}

const STORE_PREFIX: &[u8] = b"blocks";

/// A DB + cache implementation of `BlockStore`, keyed by level
#[derive(Clone)]
pub struct DbBlockStore {
    access: CachedDbAccess<LevelKey, Arc<Block>>,
}

impl DbBlockStore {
    pub fn new(db: Arc<DB>, cache_size: u64) -> Self {
        Self { access: CachedDbAccess::new(db, cache_size, STORE_PREFIX.to_vec()) }
    }
}

impl BlockStoreReader for DbBlockStore {
    fn has(&self, level: BlockLevel) -> StoreResult<bool> {
        self.access.has(level.into())
    }

    fn get(&self, level: BlockLevel) -> StoreResult<Arc<Block>> {
        self.access.read(level.into())
    }
}

impl BlockStore for DbBlockStore {
    fn insert(&self, writer: impl DbWriter, block: Arc<Block>) -> StoreResult<()> {
        self.access.write(writer, block.level().into(), block)
    }
}

use super::LevelKey;
use chainstore_database::prelude::{CachedDbAccess, DbWriter, StoreResult, DB};
use chainstore_history_core::{metadata::BlockMetadata, BlockLevel};
use std::sync::Arc;

/// Reader API for `MetadataStore`. Raw access; see `BlockStoreReader` for
/// the gating convention.
pub trait MetadataStoreReader {
    fn has(&self, level: BlockLevel) -> StoreResult<bool>;
    fn get(&self, level: BlockLevel) -> StoreResult<BlockMetadata>;
}

pub trait MetadataStore: MetadataStoreReader {
    fn insert(&self, writer: impl DbWriter, metadata: &BlockMetadata) -> StoreResult<()>;

    /// Deletes the metadata of all levels in `[from, to)`. This is the
    /// pruning primitive: levels, not hashes, so the deleted range is
    /// contiguous in key space.
    fn delete_range(&self, writer: impl DbWriter, from: BlockLevel, to: BlockLevel) -> StoreResult<()>;
}

const STORE_PREFIX: &[u8] = b"metadata";

/// A DB + cache implementation of `MetadataStore`, keyed by level
#[derive(Clone)]
pub struct DbMetadataStore {
    access: CachedDbAccess<LevelKey, BlockMetadata>,
}

impl DbMetadataStore {
    pub fn new(db: Arc<DB>, cache_size: u64) -> Self {
        Self { access: CachedDbAccess::new(db, cache_size, STORE_PREFIX.to_vec()) }
    }
}

impl MetadataStoreReader for DbMetadataStore {
    fn has(&self, level: BlockLevel) -> StoreResult<bool> {
        self.access.has(level.into())
    }

    fn get(&self, level: BlockLevel) -> StoreResult<BlockMetadata> {
        self.access.read(level.into())
    }
}

impl MetadataStore for DbMetadataStore {
    fn insert(&self, writer: impl DbWriter, metadata: &BlockMetadata) -> StoreResult<()> {
        self.access.write(writer, metadata.level.into(), metadata.clone())
    }

    fn delete_range(&self, writer: impl DbWriter, from: BlockLevel, to: BlockLevel) -> StoreResult<()> {
        self.access.delete_range(writer, from.into(), to.into())
    }
}

use chainstore_database::prelude::{CachedDbItem, DbWriter, StoreResult, DB};
use chainstore_hashes::Hash;
use chainstore_history_core::BlockLevel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The store's retention pointers, kept as a single compound row so that
/// head advancement and pruning update them atomically with one batch put.
///
/// Invariant: `caboose <= savepoint <= head_level`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionData {
    pub head_hash: Hash,
    pub head_level: BlockLevel,
    /// Lowest level whose metadata is served
    pub savepoint: BlockLevel,
    /// Lowest level whose block is served
    pub caboose: BlockLevel,
}

impl RetentionData {
    /// Whether the store retains (and serves) the complete history,
    /// i.e. there is nothing a reconstruction could rebuild
    pub fn is_fully_archived(&self) -> bool {
        self.savepoint == 0 && self.caboose == 0
    }
}

/// Reader API for `RetentionStore`
pub trait RetentionStoreReader {
    fn get(&self) -> StoreResult<RetentionData>;
}

pub trait RetentionStore: RetentionStoreReader {
    fn set(&mut self, writer: impl DbWriter, data: RetentionData) -> StoreResult<()>;
}

const RETENTION_KEY: &[u8] = b"retention";

/// A DB + cache implementation of `RetentionStore`
#[derive(Clone)]
pub struct DbRetentionStore {
    item: CachedDbItem<RetentionData>,
}

impl DbRetentionStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { item: CachedDbItem::new(db, RETENTION_KEY.to_vec()) }
    }
}

impl RetentionStoreReader for DbRetentionStore {
    fn get(&self) -> StoreResult<RetentionData> {
        self.item.read()
    }
}

impl RetentionStore for DbRetentionStore {
    fn set(&mut self, writer: impl DbWriter, data: RetentionData) -> StoreResult<()> {
        debug_assert!(data.caboose <= data.savepoint && data.savepoint <= data.head_level);
        self.item.write(writer, &data)
    }
}

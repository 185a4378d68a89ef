use crate::{
    errors::{HistoryError, HistoryResult},
    model::stores::{
        blocks::BlockStoreReader,
        metadata::MetadataStore,
        retention::{RetentionData, RetentionStore},
    },
    processes::apply::apply_block,
};
use chainstore_database::prelude::{BatchDbWriter, StoreError, DB};
use chainstore_history_core::config::params::Params;
use log::info;
use rocksdb::WriteBatch;
use std::{mem, sync::Arc};

/// Number of rebuilt metadata rows flushed per write batch
const RECONSTRUCTION_BATCH_SIZE: usize = 512;

/// Rebuilds the metadata of every pruned level by replaying the chain from
/// genesis, restoring archive-equivalent retention.
///
/// The caller must hold exclusive access to the store: reconstruction runs
/// only while the node is stopped.
#[derive(Clone)]
pub struct ReconstructionManager {
    params: Params,
}

impl ReconstructionManager {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    pub fn reconstruct<B, M, R>(&self, db: &Arc<DB>, block_store: &B, metadata_store: &M, retention_store: &mut R) -> HistoryResult<()>
    where
        B: BlockStoreReader,
        M: MetadataStore,
        R: RetentionStore,
    {
        let retention = retention_store.get()?;
        if retention.is_fully_archived() {
            return Err(HistoryError::NothingToReconstruct);
        }

        info!(
            "reconstructing storage: rebuilding metadata for levels below {} (head level: {})",
            retention.savepoint, retention.head_level
        );

        // Metadata exists for [savepoint, head]; everything below the
        // savepoint is replayed. Rows that survived (genesis, or leftovers
        // of a previously interrupted run) are skipped.
        let mut batch = WriteBatch::default();
        let mut rebuilt = 0u64;
        for level in 0..retention.savepoint {
            if metadata_store.has(level)? {
                continue;
            }
            let block = block_store.get(level)?;
            metadata_store.insert(BatchDbWriter::new(&mut batch), &apply_block(&self.params, &block))?;
            rebuilt += 1;
            if batch.len() >= RECONSTRUCTION_BATCH_SIZE {
                db.write(mem::take(&mut batch)).map_err(StoreError::from)?;
            }
        }

        // The pointer reset rides the final batch, so a crash mid-replay
        // leaves the pointers untouched and the run restartable
        let restored = RetentionData { savepoint: 0, caboose: 0, ..retention };
        retention_store.set(BatchDbWriter::new(&mut batch), restored)?;
        db.write(batch).map_err(StoreError::from)?;

        info!("reconstruction complete: rebuilt {} metadata rows", rebuilt);
        Ok(())
    }
}

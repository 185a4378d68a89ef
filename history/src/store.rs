use crate::{
    errors::{HistoryError, HistoryResult},
    model::stores::{
        blocks::{BlockStore, BlockStoreReader, DbBlockStore},
        metadata::{DbMetadataStore, MetadataStore, MetadataStoreReader},
        retention::{DbRetentionStore, RetentionData, RetentionStore, RetentionStoreReader},
    },
    processes::{apply::apply_block, pruning::PruningManager, reconstruct::ReconstructionManager},
    snapshot::{self, SnapshotHeader, SnapshotPayload},
};
use chainstore_database::prelude::{BatchDbWriter, StoreError, StoreResultExtensions, DB};
use chainstore_hashes::Hash;
use chainstore_history_core::{
    block::Block,
    config::{Config, GENESIS},
    metadata::BlockMetadata,
    BlockLevel,
};
use itertools::Itertools;
use log::{debug, info, trace};
use parking_lot::RwLock;
use rocksdb::WriteBatch;
use std::{cmp::max, mem, path::Path, sync::Arc};

/// Number of imported blocks flushed per write batch
const IMPORT_BATCH_SIZE: usize = 512;

/// The storage history state machine of a single node.
///
/// Owns the level-keyed block and metadata stores plus the retention
/// pointers, and enforces the serving contract:
/// blocks are served for levels in `[caboose, head]`, metadata for levels
/// in `[savepoint, head]`, and genesis is always served.
pub struct HistoryStore {
    db: Arc<DB>,
    config: Config,
    block_store: DbBlockStore,
    metadata_store: DbMetadataStore,
    retention_store: RwLock<DbRetentionStore>,
    pruning_manager: PruningManager,
    reconstruction_manager: ReconstructionManager,
}

impl HistoryStore {
    /// Opens the store over the given DB. A fresh DB is committed its
    /// genesis block; an existing DB resumes from the persisted pointers.
    pub fn new(db: Arc<DB>, config: Config) -> HistoryResult<Self> {
        let store = Self {
            block_store: DbBlockStore::new(db.clone(), config.cache_size),
            metadata_store: DbMetadataStore::new(db.clone(), config.cache_size),
            retention_store: RwLock::new(DbRetentionStore::new(db.clone())),
            pruning_manager: PruningManager::new(config.params, config.history_mode),
            reconstruction_manager: ReconstructionManager::new(config.params),
            db,
            config,
        };
        store.init_genesis()?;
        Ok(store)
    }

    /// Seeds a fresh store from a snapshot file. The DB must be empty; the
    /// resulting head equals the snapshot's export level/hash, metadata is
    /// available for the export block only, and the caboose starts at
    /// genesis since a full snapshot carries the complete block history.
    pub fn import_snapshot(db: Arc<DB>, config: Config, path: &Path) -> HistoryResult<Self> {
        let (header, payload) = snapshot::read_snapshot(path)?;
        info!("importing snapshot {} (export level {})", path.display(), header.export_level);

        let block_store = DbBlockStore::new(db.clone(), config.cache_size);
        let metadata_store = DbMetadataStore::new(db.clone(), config.cache_size);
        let mut retention_store = DbRetentionStore::new(db.clone());
        if retention_store.get().optional()?.is_some() {
            return Err(HistoryError::MalformedSnapshot("refusing to import into a non-empty store".into()));
        }

        let mut batch = WriteBatch::default();
        for block in payload.blocks {
            block_store.insert(BatchDbWriter::new(&mut batch), Arc::new(block))?;
            if batch.len() >= IMPORT_BATCH_SIZE {
                db.write(mem::take(&mut batch)).map_err(StoreError::from)?;
            }
        }
        // Genesis metadata is always served, so it is rebuilt on the spot;
        // every other pruned level waits for an explicit reconstruction
        metadata_store.insert(BatchDbWriter::new(&mut batch), &apply_block(&config.params, &GENESIS.build_block()))?;
        metadata_store.insert(BatchDbWriter::new(&mut batch), &payload.export_metadata)?;
        let retention = RetentionData {
            head_hash: header.export_hash,
            head_level: header.export_level,
            savepoint: header.export_level,
            caboose: 0,
        };
        retention_store.set(BatchDbWriter::new(&mut batch), retention)?;
        db.write(batch).map_err(StoreError::from)?;

        Self::new(db, config)
    }

    fn init_genesis(&self) -> HistoryResult<()> {
        if self.retention_store.read().get().optional()?.is_some() {
            return Ok(());
        }
        let genesis = GENESIS.build_block();
        let mut batch = WriteBatch::default();
        self.block_store.insert(BatchDbWriter::new(&mut batch), Arc::new(genesis.clone()))?;
        self.metadata_store.insert(BatchDbWriter::new(&mut batch), &apply_block(&self.config.params, &genesis))?;
        let retention = RetentionData { head_hash: genesis.hash(), head_level: 0, savepoint: 0, caboose: 0 };
        self.retention_store.write().set(BatchDbWriter::new(&mut batch), retention)?;
        self.db.write(batch).map_err(StoreError::from)?;
        info!("store initialized with genesis block {}", genesis.hash());
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn retention(&self) -> HistoryResult<RetentionData> {
        Ok(self.retention_store.read().get()?)
    }

    pub fn head(&self) -> HistoryResult<(Hash, BlockLevel)> {
        let retention = self.retention()?;
        Ok((retention.head_hash, retention.head_level))
    }

    pub fn savepoint(&self) -> HistoryResult<BlockLevel> {
        Ok(self.retention()?.savepoint)
    }

    pub fn caboose(&self) -> HistoryResult<BlockLevel> {
        Ok(self.retention()?.caboose)
    }

    /// Appends the next block: validates continuity with the current head,
    /// applies the block, and advances the retention pointers when a newly
    /// cemented cycle falls out of the pruning allowance.
    pub fn append_block(&self, block: Block) -> HistoryResult<()> {
        // The retention store lock doubles as the append lock, keeping
        // concurrent appends sequential
        let mut retention_store = self.retention_store.write();
        let current = retention_store.get()?;
        if block.level() != current.head_level + 1 {
            return Err(HistoryError::BlockOutOfOrder(block.level(), current.head_level));
        }
        if block.header.parent != current.head_hash {
            return Err(HistoryError::ParentMismatch { level: block.level(), expected: current.head_hash, found: block.header.parent });
        }

        let metadata = apply_block(&self.config.params, &block);
        let mut batch = WriteBatch::default();
        let mut next = RetentionData { head_hash: block.hash(), head_level: block.level(), ..current };
        trace!("appending block {} at level {}", block.hash(), block.level());
        self.block_store.insert(BatchDbWriter::new(&mut batch), Arc::new(block))?;
        self.metadata_store.insert(BatchDbWriter::new(&mut batch), &metadata)?;

        if let Some(target) = self.pruning_manager.next_retention(&next) {
            debug!("pruning metadata for levels [{}, {}) at head {}", max(current.savepoint, 1), target, next.head_level);
            // Genesis metadata is never deleted
            self.metadata_store.delete_range(BatchDbWriter::new(&mut batch), max(current.savepoint, 1), target)?;
            next.savepoint = target;
            next.caboose = target;
        }

        retention_store.set(BatchDbWriter::new(&mut batch), next)?;
        self.db.write(batch).map_err(StoreError::from)?;
        Ok(())
    }

    /// Serves the block at `level`, honoring the caboose gate
    pub fn block_at(&self, level: BlockLevel) -> HistoryResult<Arc<Block>> {
        let retention = self.retention()?;
        if level > retention.head_level || (level != 0 && level < retention.caboose) {
            return Err(HistoryError::BlockNotFound(level));
        }
        Ok(self.block_store.get(level)?)
    }

    /// Serves the metadata at `level`, honoring the savepoint gate
    pub fn metadata_at(&self, level: BlockLevel) -> HistoryResult<BlockMetadata> {
        let retention = self.retention()?;
        if level > retention.head_level || (level != 0 && level < retention.savepoint) {
            return Err(HistoryError::MetadataNotFound(level));
        }
        Ok(self.metadata_store.get(level)?)
    }

    /// Exports a snapshot at `level` into `path`. The level must be
    /// retained with metadata: at or above the savepoint, at or below the
    /// head. The artifact is deterministic given identical store state.
    pub fn export_snapshot(&self, path: &Path, level: BlockLevel) -> HistoryResult<()> {
        let retention = self.retention()?;
        if level > retention.head_level {
            return Err(HistoryError::BlockNotFound(level));
        }
        if level < retention.savepoint {
            return Err(HistoryError::MetadataNotFound(level));
        }

        info!("exporting snapshot at level {} to {}", level, path.display());
        let export_metadata = self.metadata_store.get(level)?;
        // The cemented region below the caboose is readable here even
        // though it is not served: a full snapshot always reaches genesis
        let blocks: Vec<Block> = (0..=level).map(|l| self.block_store.get(l).map(|b| b.as_ref().clone())).try_collect()?;
        let export_hash = blocks.last().expect("the range 0..=level is never empty").hash();
        let header = SnapshotHeader { export_level: level, export_hash };
        snapshot::write_snapshot(path, &header, &SnapshotPayload { blocks, export_metadata })
    }

    /// Rebuilds all pruned metadata by replaying the chain from genesis,
    /// restoring archive-equivalent retention (savepoint = caboose = 0).
    /// Fails with `NothingToReconstruct` when retention is already full.
    ///
    /// Exclusive store access is required; the node layer only invokes
    /// this while the node is stopped.
    pub fn reconstruct(&self) -> HistoryResult<()> {
        let mut retention_store = self.retention_store.write();
        self.reconstruction_manager.reconstruct(&self.db, &self.block_store, &self.metadata_store, &mut *retention_store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainstore_database::prelude::create_temp_db;
    use chainstore_history_core::config::params::{HistoryMode, SANDBOX_PARAMS};

    fn archive_config() -> Config {
        Config::new(SANDBOX_PARAMS).with_history_mode(HistoryMode::Archive)
    }

    fn full_config() -> Config {
        Config::new(SANDBOX_PARAMS).with_history_mode(HistoryMode::Full)
    }

    fn bake(store: &HistoryStore, count: usize) {
        for _ in 0..count {
            let (head_hash, head_level) = store.head().unwrap();
            let parent = store.block_at(head_level).unwrap();
            assert_eq!(parent.hash(), head_hash);
            store.append_block(Block::child_of(&parent.header, "bootstrap1".into(), vec![])).unwrap();
        }
    }

    #[test]
    fn test_fresh_store_holds_genesis_only() {
        let (_lifetime, db) = create_temp_db();
        let store = HistoryStore::new(db, archive_config()).unwrap();
        let retention = store.retention().unwrap();
        assert_eq!(retention.head_level, 0);
        assert!(retention.is_fully_archived());
        assert_eq!(store.block_at(0).unwrap().level(), 0);
        assert!(store.block_at(1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_archive_mode_never_prunes() {
        let (_lifetime, db) = create_temp_db();
        let store = HistoryStore::new(db, archive_config()).unwrap();
        bake(&store, 97);
        let retention = store.retention().unwrap();
        assert_eq!(retention.head_level, 97);
        assert!(retention.is_fully_archived());
        for level in 0..=97 {
            store.block_at(level).unwrap();
            store.metadata_at(level).unwrap();
        }
    }

    #[test]
    fn test_full_mode_availability_windows() {
        let (_lifetime, db) = create_temp_db();
        let store = HistoryStore::new(db, full_config()).unwrap();
        bake(&store, 49);
        // First batch: everything cemented so far is within the allowance
        assert!(store.retention().unwrap().is_fully_archived());

        bake(&store, 48);
        let retention = store.retention().unwrap();
        assert_eq!(retention.head_level, 97);
        assert_eq!(retention.savepoint, 41);
        assert_eq!(retention.caboose, 41);

        // Genesis is always served
        store.block_at(0).unwrap();
        store.metadata_at(0).unwrap();
        for level in 1..41 {
            assert!(store.block_at(level).unwrap_err().is_not_found(), "level {level}");
            assert!(store.metadata_at(level).unwrap_err().is_not_found(), "level {level}");
        }
        for level in 41..=97 {
            store.block_at(level).unwrap();
            store.metadata_at(level).unwrap();
        }
        assert!(store.block_at(98).unwrap_err().is_not_found());
        assert!(store.metadata_at(98).unwrap_err().is_not_found());
    }

    #[test]
    fn test_append_rejects_gaps_and_forks() {
        let (_lifetime, db) = create_temp_db();
        let store = HistoryStore::new(db, archive_config()).unwrap();
        bake(&store, 3);

        let head = store.block_at(3).unwrap();
        let skipping = Block::child_of(&Block::child_of(&head.header, "bootstrap1".into(), vec![]).header, "bootstrap1".into(), vec![]);
        assert!(matches!(store.append_block(skipping), Err(HistoryError::BlockOutOfOrder(5, 3))));

        let stale_parent = store.block_at(2).unwrap();
        let mut forked = Block::child_of(&stale_parent.header, "bootstrap1".into(), vec![]);
        forked.header.level = 4;
        forked.header.hash = forked.header.computed_hash();
        assert!(matches!(store.append_block(forked), Err(HistoryError::ParentMismatch { level: 4, .. })));
    }

    #[test]
    fn test_reconstruct_requires_pruned_state() {
        let (_lifetime, db) = create_temp_db();
        let store = HistoryStore::new(db, full_config()).unwrap();
        bake(&store, 49);
        let before = store.retention().unwrap();
        assert!(matches!(store.reconstruct(), Err(HistoryError::NothingToReconstruct)));
        // The failed call changed nothing
        assert_eq!(store.retention().unwrap(), before);
        bake(&store, 1);
        assert_eq!(store.retention().unwrap().head_level, 50);
    }

    #[test]
    fn test_reconstruct_restores_full_history() {
        let (_lifetime, db) = create_temp_db();
        let store = HistoryStore::new(db, full_config()).unwrap();
        bake(&store, 97);
        assert_eq!(store.retention().unwrap().savepoint, 41);

        store.reconstruct().unwrap();
        let retention = store.retention().unwrap();
        assert!(retention.is_fully_archived());
        assert_eq!(retention.head_level, 97);
        for level in 0..=97 {
            store.block_at(level).unwrap();
            let metadata = store.metadata_at(level).unwrap();
            assert_eq!(metadata.level, level);
        }
        // Idempotence: a second run degenerates to the precondition failure
        assert!(matches!(store.reconstruct(), Err(HistoryError::NothingToReconstruct)));
    }

    #[test]
    fn test_retention_survives_reopen() {
        let (_lifetime, db) = create_temp_db();
        let store = HistoryStore::new(db.clone(), full_config()).unwrap();
        bake(&store, 97);
        let before = store.retention().unwrap();
        drop(store);

        // Same DB, fresh store handle: caches are cold, pointers persist
        let reopened = HistoryStore::new(db, full_config()).unwrap();
        assert_eq!(reopened.retention().unwrap(), before);
        assert!(reopened.block_at(40).unwrap_err().is_not_found());
        reopened.block_at(41).unwrap();
    }

    #[test]
    fn test_export_validates_the_level() {
        let (_lifetime, db) = create_temp_db();
        let store = HistoryStore::new(db, full_config()).unwrap();
        bake(&store, 97);
        let dir = tempfile::tempdir().unwrap();

        let above_head = dir.path().join("above.full");
        assert!(matches!(store.export_snapshot(&above_head, 98), Err(HistoryError::BlockNotFound(98))));
        let below_savepoint = dir.path().join("below.full");
        assert!(matches!(store.export_snapshot(&below_savepoint, 40), Err(HistoryError::MetadataNotFound(40))));
        store.export_snapshot(&dir.path().join("snapshot_block_64.full"), 64).unwrap();
    }

    #[test]
    fn test_import_restores_the_exported_head() {
        let (_lifetime, db) = create_temp_db();
        let store = HistoryStore::new(db, archive_config()).unwrap();
        bake(&store, 49);
        let (head_hash, head_level) = store.head().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot_block_48.full");
        store.export_snapshot(&path, head_level).unwrap();

        let (_lifetime2, db2) = create_temp_db();
        let imported = HistoryStore::import_snapshot(db2, full_config(), &path).unwrap();
        let retention = imported.retention().unwrap();
        assert_eq!((retention.head_hash, retention.head_level), (head_hash, head_level));
        assert_eq!(retention.savepoint, 49);
        assert_eq!(retention.caboose, 0);

        // Blocks are all present, metadata only at genesis and the export level
        for level in 0..=49 {
            imported.block_at(level).unwrap();
        }
        imported.metadata_at(0).unwrap();
        imported.metadata_at(49).unwrap();
        for level in 1..49 {
            assert!(imported.metadata_at(level).unwrap_err().is_not_found(), "level {level}");
        }
    }

    #[test]
    fn test_import_then_reconstruct_equals_archive_retention() {
        let (_lifetime, db) = create_temp_db();
        let archive = HistoryStore::new(db, archive_config()).unwrap();
        bake(&archive, 49);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot_block_48.full");
        store_export(&archive, &path);

        let (_lifetime2, db2) = create_temp_db();
        let imported = HistoryStore::import_snapshot(db2, archive_config(), &path).unwrap();
        imported.reconstruct().unwrap();

        assert_eq!(imported.retention().unwrap(), archive.retention().unwrap());
        for level in 0..=49 {
            assert_eq!(imported.block_at(level).unwrap(), archive.block_at(level).unwrap());
            assert_eq!(imported.metadata_at(level).unwrap(), archive.metadata_at(level).unwrap());
        }
    }

    fn store_export(store: &HistoryStore, path: &std::path::Path) {
        let (_, head_level) = store.head().unwrap();
        store.export_snapshot(path, head_level).unwrap();
    }

    #[test]
    fn test_import_rejects_non_empty_store() {
        let (_lifetime, db) = create_temp_db();
        let store = HistoryStore::new(db.clone(), archive_config()).unwrap();
        bake(&store, 5);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot_block_5.full");
        store.export_snapshot(&path, 5).unwrap();
        drop(store);

        assert!(matches!(
            HistoryStore::import_snapshot(db, archive_config(), &path),
            Err(HistoryError::MalformedSnapshot(_))
        ));
    }
}

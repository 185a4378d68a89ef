use chainstore_database::prelude::StoreError;
use chainstore_hashes::Hash;
use chainstore_history_core::BlockLevel;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    /// The queried level is outside the retained block range. The message
    /// text is a stable contract: callers surface it verbatim and the CLI
    /// layer matches on its prefix.
    #[error("Unable to find block at level {0}")]
    BlockNotFound(BlockLevel),

    #[error("Unable to find block metadata at level {0}")]
    MetadataNotFound(BlockLevel),

    /// Reconstruction precondition failure: the store already retains full
    /// history. Non-fatal; the store remains usable.
    #[error("nothing to reconstruct.")]
    NothingToReconstruct,

    #[error("block at level {0} does not extend the current head at level {1}")]
    BlockOutOfOrder(BlockLevel, BlockLevel),

    #[error("parent hash mismatch at level {level}: expected {expected}, found {found}")]
    ParentMismatch { level: BlockLevel, expected: Hash, found: Hash },

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("snapshot version {0} is not supported (current version: {1})")]
    UnsupportedSnapshotVersion(u16, u16),

    #[error("snapshot io error: {0}")]
    SnapshotIo(#[from] std::io::Error),

    #[error(transparent)]
    StoreError(#[from] StoreError),
}

impl HistoryError {
    /// Whether this is an availability failure (pruned or unknown level),
    /// the expected outcome of querying outside the retained range
    pub fn is_not_found(&self) -> bool {
        matches!(self, HistoryError::BlockNotFound(_) | HistoryError::MetadataNotFound(_))
    }
}

pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

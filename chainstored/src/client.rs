use crate::daemon::{Node, NodeError};
use chainstore_hashes::Hash;
use chainstore_history::{errors::HistoryResult, HistoryStore};
use chainstore_history_core::{block::Block, metadata::BlockMetadata, BlockLevel};
use std::sync::Arc;
use thiserror::Error;

/// The `Command failed : ` prefix every wrapped failure carries; tests
/// match CLI-visible errors against it
pub const COMMAND_FAILED_PREFIX: &str = "Command failed : ";

#[derive(Error, Debug)]
pub enum ClientError {
    /// A command reached the node and failed there. Carries the failure
    /// text verbatim for outer-layer pattern matching; typed handling
    /// should happen below this boundary.
    #[error("Command failed : {0}")]
    CommandFailed(String),

    /// The node did not answer at all (not running). A harness/environment
    /// condition, deliberately distinct from command failures.
    #[error("the node is not listening")]
    NotListening,
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Typed command surface over one node, mirroring what the CLI client of
/// the daemon exposes.
#[derive(Clone)]
pub struct Client {
    node: Arc<Node>,
}

impl Client {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    pub fn check_node_listening(&self) -> bool {
        self.node.is_running()
    }

    pub fn bake(&self, delegate: &str) -> ClientResult<Block> {
        wrap(self.node.bake(delegate))
    }

    pub fn get_head(&self) -> ClientResult<(Hash, BlockLevel)> {
        self.query(|store| store.head())
    }

    pub fn get_block_at_level(&self, level: BlockLevel) -> ClientResult<Arc<Block>> {
        self.query(|store| store.block_at(level))
    }

    pub fn get_block_metadata_at_level(&self, level: BlockLevel) -> ClientResult<BlockMetadata> {
        self.query(|store| store.metadata_at(level))
    }

    pub fn get_savepoint(&self) -> ClientResult<BlockLevel> {
        self.query(|store| store.savepoint())
    }

    pub fn get_caboose(&self) -> ClientResult<BlockLevel> {
        self.query(|store| store.caboose())
    }

    fn query<T>(&self, f: impl FnOnce(&HistoryStore) -> HistoryResult<T>) -> ClientResult<T> {
        match self.node.with_store(f) {
            Ok(inner) => inner.map_err(|err| ClientError::CommandFailed(err.to_string())),
            Err(err) => Err(wrap_node_error(err)),
        }
    }
}

fn wrap<T>(result: Result<T, NodeError>) -> ClientResult<T> {
    result.map_err(wrap_node_error)
}

fn wrap_node_error(err: NodeError) -> ClientError {
    match err {
        NodeError::NotRunning => ClientError::NotListening,
        other => ClientError::CommandFailed(other.to_string()),
    }
}

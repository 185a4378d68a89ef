use crate::args::Args;
use chainstore_database::prelude::{delete_db, ConnBuilder, StoreError};
use chainstore_history::{errors::HistoryError, HistoryStore};
use chainstore_history_core::block::Block;
use log::{info, warn};
use parking_lot::RwLock;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

const DEFAULT_APP_DIR: &str = ".chainstore";
const DEFAULT_DATA_DIR: &str = "datadir";
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("the node is already running")]
    AlreadyRunning,

    #[error("the node is not running")]
    NotRunning,

    /// Reconstruction takes the whole store exclusively; a running node
    /// holds it open
    #[error("the store is held by the running node; stop it first")]
    StoreHeldByNode,

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NodeResult<T> = std::result::Result<T, NodeError>;

struct RunningNode {
    store: Arc<HistoryStore>,
}

/// A single storage node: the owner of one data directory and the
/// lifecycle of the store within it.
///
/// `run` opens the store (first launch: genesis init, or snapshot import
/// when configured) and `terminate` drops it, closing the DB and
/// discarding every in-memory cache, so a restarted node resumes purely
/// from the persisted state.
pub struct Node {
    args: Args,
    app_dir: PathBuf,
    db_dir: PathBuf,
    runtime: RwLock<Option<RunningNode>>,
}

impl Node {
    pub fn new(args: Args) -> NodeResult<Node> {
        let app_dir = resolve_app_dir(&args);
        let db_dir = app_dir.join(DEFAULT_DATA_DIR);
        if args.reset_db && db_dir.exists() {
            warn!("resetting database at {}", db_dir.display());
            delete_db(&db_dir).map_err(StoreError::from)?;
        }
        fs::create_dir_all(&app_dir)?;
        Ok(Node { args, app_dir, db_dir, runtime: RwLock::new(None) })
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    pub fn is_running(&self) -> bool {
        self.runtime.read().is_some()
    }

    /// Starts the node. On the very first launch of a node configured with
    /// a snapshot, the store is seeded by importing it (followed by an
    /// immediate reconstruction when the flag asks for one) before the
    /// node is considered ready.
    pub fn run(&self) -> NodeResult<()> {
        let mut runtime = self.runtime.write();
        if runtime.is_some() {
            return Err(NodeError::AlreadyRunning);
        }

        let first_launch = !self.db_dir.exists();
        let db = ConnBuilder::new(self.db_dir.clone()).with_default_parallelism().build()?;
        let config = self.args.build_config();
        let store = match (&self.args.snapshot, first_launch) {
            (Some(snapshot), true) => {
                let store = HistoryStore::import_snapshot(db, config, Path::new(snapshot))?;
                if self.args.reconstruct {
                    store.reconstruct()?;
                }
                store
            }
            _ => HistoryStore::new(db, config)?,
        };

        let (head_hash, head_level) = store.head()?;
        info!("node running (history mode: {}, head: {} at level {})", self.args.history_mode, head_hash, head_level);
        *runtime = Some(RunningNode { store: Arc::new(store) });
        Ok(())
    }

    /// Stops the node, closing the DB and dropping all in-memory caches
    pub fn terminate(&self) -> NodeResult<()> {
        let mut runtime = self.runtime.write();
        if runtime.take().is_none() {
            return Err(NodeError::NotRunning);
        }
        info!("node terminated");
        Ok(())
    }

    /// Rebuilds all pruned metadata. Only valid while the node is stopped:
    /// reconstruction needs the store exclusively. The precondition
    /// failure (`nothing to reconstruct.`) leaves the node startable.
    pub fn reconstruct(&self) -> NodeResult<()> {
        let runtime = self.runtime.read();
        if runtime.is_some() {
            return Err(NodeError::StoreHeldByNode);
        }
        let db = ConnBuilder::new(self.db_dir.clone()).with_default_parallelism().build()?;
        let store = HistoryStore::new(db, self.args.build_config())?;
        store.reconstruct()?;
        Ok(())
    }

    /// Exports a snapshot of the running store at the given level
    pub fn snapshot_export(&self, path: &Path, level: u64) -> NodeResult<()> {
        Ok(self.with_store(|store| store.export_snapshot(path, level))??)
    }

    /// Bakes the next block on top of the current head and commits it,
    /// returning the block for relaying
    pub fn bake(&self, baker: &str) -> NodeResult<Block> {
        let baked = self.with_store(|store| {
            let (_, head_level) = store.head()?;
            let parent = store.block_at(head_level)?;
            let block = Block::child_of(&parent.header, baker.to_string(), vec![]);
            store.append_block(block.clone())?;
            Ok::<_, HistoryError>(block)
        })??;
        Ok(baked)
    }

    /// Ingests a block produced elsewhere (the relay path). The store
    /// applies its own retention policy to it.
    pub fn deliver_block(&self, block: Block) -> NodeResult<()> {
        Ok(self.with_store(|store| store.append_block(block))??)
    }

    /// Runs `f` against the running store, failing when the node is down
    pub fn with_store<R>(&self, f: impl FnOnce(&HistoryStore) -> R) -> NodeResult<R> {
        let runtime = self.runtime.read();
        match runtime.as_ref() {
            Some(running) => Ok(f(&running.store)),
            None => Err(NodeError::NotRunning),
        }
    }
}

fn resolve_app_dir(args: &Args) -> PathBuf {
    match &args.appdir {
        Some(appdir) => PathBuf::from(appdir),
        None => dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(DEFAULT_APP_DIR),
    }
}

/// Resolves the log directory implied by the arguments, `None` when file
/// logging is disabled
pub fn get_log_dir(args: &Args) -> Option<String> {
    if args.no_log_files {
        return None;
    }
    let log_dir = match &args.logdir {
        Some(logdir) => PathBuf::from(logdir),
        None => resolve_app_dir(args).join(DEFAULT_LOG_DIR),
    };
    log_dir.to_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainstore_history_core::config::params::HistoryMode;
    use tempfile::TempDir;

    fn sandbox_node(dir: &TempDir) -> Node {
        let args = Args {
            appdir: Some(dir.path().to_str().unwrap().to_owned()),
            sandbox: true,
            history_mode: HistoryMode::Archive,
            ..Default::default()
        };
        Node::new(args).unwrap()
    }

    #[test]
    fn test_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let node = sandbox_node(&dir);
        assert!(!node.is_running());
        assert!(matches!(node.terminate(), Err(NodeError::NotRunning)));

        node.run().unwrap();
        assert!(node.is_running());
        assert!(matches!(node.run(), Err(NodeError::AlreadyRunning)));

        node.terminate().unwrap();
        assert!(!node.is_running());
    }

    #[test]
    fn test_reconstruct_requires_stopped_node() {
        let dir = tempfile::tempdir().unwrap();
        let node = sandbox_node(&dir);
        node.run().unwrap();
        assert!(matches!(node.reconstruct(), Err(NodeError::StoreHeldByNode)));
        node.terminate().unwrap();

        // Fresh archive store: the precondition fails but the node stays startable
        assert!(matches!(node.reconstruct(), Err(NodeError::History(HistoryError::NothingToReconstruct))));
        node.run().unwrap();
        assert!(node.is_running());
    }

    #[test]
    fn test_restart_resumes_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let node = sandbox_node(&dir);
        node.run().unwrap();
        let baked = node
            .with_store(|store| {
                let parent = store.block_at(0).unwrap();
                let block = Block::child_of(&parent.header, "bootstrap1".into(), vec![]);
                store.append_block(block.clone()).unwrap();
                block
            })
            .unwrap();
        node.terminate().unwrap();

        node.run().unwrap();
        let head = node.with_store(|store| store.head().unwrap()).unwrap();
        assert_eq!(head, (baked.hash(), 1));
    }
}

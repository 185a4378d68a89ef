use super::utils::wait_until;
use chainstore_history_core::config::params::HistoryMode;
use chainstored::{args::Args, client::Client, daemon::Node};
use log::info;
use std::{collections::BTreeMap, path::PathBuf, sync::Arc, time::Duration};
use tempfile::TempDir;

pub const DEFAULT_BAKER: &str = "bootstrap1";
pub const ACTIVATOR: &str = "activator";

const READINESS_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-node options for `Sandbox::add_node`
#[derive(Clone, Default)]
pub struct NodeOptions {
    pub history_mode: HistoryMode,
    pub snapshot: Option<PathBuf>,
    pub reconstruct: bool,
}

impl NodeOptions {
    pub fn archive() -> Self {
        Self { history_mode: HistoryMode::Archive, ..Default::default() }
    }

    pub fn with_snapshot(mut self, snapshot: PathBuf) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn with_reconstruct(mut self) -> Self {
        self.reconstruct = true;
        self
    }
}

/// A keyed set of in-process nodes over per-node temp dirs, with the
/// cross-node concerns the store itself does not model: relaying baked
/// blocks to running peers and catching a newly added node up from the
/// first node.
#[derive(Default)]
pub struct Sandbox {
    nodes: BTreeMap<usize, Arc<Node>>,
    // Keeps every node's data dir alive for the sandbox lifetime
    dirs: Vec<TempDir>,
}

impl Sandbox {
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates and starts a node. When the sandbox already has nodes, the
    /// new one is synced up to the lowest-id node's head.
    pub fn add_node(&mut self, id: usize, options: NodeOptions) {
        assert!(!self.nodes.contains_key(&id), "node {id} already exists");
        let dir = tempfile::Builder::new().prefix(&format!("chainstore-sandbox-{id}-")).tempdir().unwrap();
        let args = Args {
            appdir: Some(dir.path().to_str().unwrap().to_owned()),
            sandbox: true,
            history_mode: options.history_mode,
            snapshot: options.snapshot.as_ref().map(|path| path.to_str().unwrap().to_owned()),
            reconstruct: options.reconstruct,
            ..Default::default()
        };
        self.dirs.push(dir);

        let node = Arc::new(Node::new(args).unwrap());
        node.run().unwrap();
        info!("sandbox: node {id} up ({})", options.history_mode);

        let source = self.nodes.keys().next().copied();
        self.nodes.insert(id, node);
        if let Some(source) = source {
            self.sync(source, id);
        }
    }

    pub fn node(&self, id: usize) -> &Arc<Node> {
        self.nodes.get(&id).unwrap_or_else(|| panic!("no node {id} in the sandbox"))
    }

    pub fn client(&self, id: usize) -> Client {
        Client::new(self.node(id).clone())
    }

    /// Commits the activation block (level 1) on the lowest-id node and
    /// relays it like a regular bake
    pub fn activate(&self) {
        let id = *self.nodes.keys().next().expect("the sandbox has nodes");
        self.bake(id, ACTIVATOR);
    }

    /// Bakes one block on `id` and relays it to every other running node.
    /// Each receiver applies its own retention policy while ingesting.
    pub fn bake(&self, id: usize, delegate: &str) {
        let block = self.client(id).bake(delegate).unwrap();
        for (&peer_id, peer) in self.nodes.iter().filter(|(&peer_id, _)| peer_id != id) {
            if peer.is_running() {
                peer.deliver_block(block.clone()).unwrap_or_else(|err| panic!("relay to node {peer_id} failed: {err}"));
            }
        }
    }

    /// Restart `id` to clear the store's cache
    pub fn clear_cache(&self, id: usize) {
        let node = self.node(id);
        node.terminate().unwrap();
        node.run().unwrap();
        let client = self.client(id);
        assert!(wait_until(READINESS_TIMEOUT, || client.check_node_listening()));
    }

    /// Catches `target` up to `source`'s head by pulling its blocks
    fn sync(&self, source: usize, target: usize) {
        let source_client = self.client(source);
        let target_client = self.client(target);
        let (_, source_head) = source_client.get_head().unwrap();
        let (_, target_head) = target_client.get_head().unwrap();
        for level in target_head + 1..=source_head {
            let block = source_client.get_block_at_level(level).unwrap();
            self.node(target).deliver_block(block.as_ref().clone()).unwrap();
        }
    }

    /// The path a node-owned artifact (such as a snapshot) lives at
    pub fn node_file(&self, id: usize, name: &str) -> PathBuf {
        self.node(id).app_dir().join(name)
    }
}

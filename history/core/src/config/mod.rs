pub mod genesis;
pub mod params;

pub use genesis::GENESIS;
pub use params::{HistoryMode, Params, MAINNET_PARAMS, SANDBOX_PARAMS};

use std::ops::Deref;

pub const DEFAULT_CACHE_SIZE: u64 = 2048;

/// Store configuration: chain parameters plus per-node policy knobs
#[derive(Clone, Debug)]
pub struct Config {
    pub params: Params,
    pub history_mode: HistoryMode,
    /// Per-store cache size, in entries
    pub cache_size: u64,
}

impl Config {
    pub fn new(params: Params) -> Self {
        Self { params, history_mode: HistoryMode::default(), cache_size: DEFAULT_CACHE_SIZE }
    }

    pub fn with_history_mode(mut self, history_mode: HistoryMode) -> Self {
        self.history_mode = history_mode;
        self
    }

    pub fn with_cache_size(mut self, cache_size: u64) -> Self {
        self.cache_size = cache_size;
        self
    }
}

impl Deref for Config {
    type Target = Params;

    fn deref(&self) -> &Self::Target {
        &self.params
    }
}

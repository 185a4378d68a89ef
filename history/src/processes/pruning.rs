use crate::model::stores::retention::RetentionData;
use chainstore_history_core::{
    config::params::{HistoryMode, Params},
    BlockLevel,
};

/// Decides when and how far the retention pointers advance.
///
/// The manager is purely decisional; applying the decision (deleting the
/// pruned metadata rows and persisting the pointers) is the store's job.
#[derive(Clone)]
pub struct PruningManager {
    params: Params,
    history_mode: HistoryMode,
}

impl PruningManager {
    pub fn new(params: Params, history_mode: HistoryMode) -> Self {
        Self { params, history_mode }
    }

    /// Returns the level both pointers should advance to for the given
    /// retention state, or `None` when nothing is prunable: archive mode,
    /// too few cemented cycles, or a savepoint already at/above the target.
    pub fn next_retention(&self, current: &RetentionData) -> Option<BlockLevel> {
        if !self.history_mode.prunes() {
            return None;
        }
        let target = self.params.target_savepoint(current.head_level);
        (target > current.savepoint).then_some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainstore_hashes::Hash;
    use chainstore_history_core::config::params::SANDBOX_PARAMS;

    fn retention(head_level: u64, savepoint: u64, caboose: u64) -> RetentionData {
        RetentionData { head_hash: Hash::from(head_level), head_level, savepoint, caboose }
    }

    #[test]
    fn test_archive_never_prunes() {
        let manager = PruningManager::new(SANDBOX_PARAMS, HistoryMode::Archive);
        for head in 0..=200 {
            assert_eq!(manager.next_retention(&retention(head, 0, 0)), None);
        }
    }

    #[test]
    fn test_full_prunes_past_the_allowance() {
        let manager = PruningManager::new(SANDBOX_PARAMS, HistoryMode::Full);
        // First batch: four cemented cycles, all within the allowance
        assert_eq!(manager.next_retention(&retention(49, 0, 0)), None);
        // Second batch: ten cemented cycles, the oldest five get pruned
        assert_eq!(manager.next_retention(&retention(97, 0, 0)), Some(41));
        // Already there: no further advance
        assert_eq!(manager.next_retention(&retention(97, 41, 41)), None);
    }

    #[test]
    fn test_savepoint_ahead_of_target_stays() {
        // A store seeded from a snapshot holds a savepoint far ahead of
        // what pruning would dictate; it must not regress
        let manager = PruningManager::new(SANDBOX_PARAMS, HistoryMode::Full);
        assert_eq!(manager.next_retention(&retention(50, 49, 0)), None);
    }
}

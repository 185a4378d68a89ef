use crate::BlockLevel;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Retention/pruning policy of a store.
///
/// Rolling is accepted and persisted but currently retains exactly like
/// Full; the scenarios this workspace models never diverge the two, and
/// their split is deliberately left undefined until one does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    Archive,
    #[default]
    Full,
    Rolling,
}

impl HistoryMode {
    /// Whether cemented cycles are ever pruned in this mode
    pub fn prunes(&self) -> bool {
        !matches!(self, HistoryMode::Archive)
    }
}

impl Display for HistoryMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HistoryMode::Archive => "archive",
            HistoryMode::Full => "full",
            HistoryMode::Rolling => "rolling",
        })
    }
}

impl FromStr for HistoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "archive" => Ok(HistoryMode::Archive),
            "full" => Ok(HistoryMode::Full),
            "rolling" => Ok(HistoryMode::Rolling),
            _ => Err(format!("unknown history mode '{s}' (expected archive, full or rolling)")),
        }
    }
}

/// Consensus-independent chain parameters governing cycle layout and
/// cementing depth.
///
/// Levels `[c*cycle_size + 1, (c+1)*cycle_size]` form cycle `c`; genesis
/// (level 0) belongs to no cycle and is never pruned. A cycle is *cemented*
/// once its last level is `cemented_limit` or more below the head, and
/// pruning modes drop the metadata of fully-cemented cycles older than the
/// `additional_cycles` most recent ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub cycle_size: u64,
    pub additional_cycles: u64,
}

/// Sandbox parameters: tiny cycles so that cementing and pruning are
/// reachable within a few dozen bakes
pub const SANDBOX_PARAMS: Params = Params { cycle_size: 8, additional_cycles: 5 };

pub const MAINNET_PARAMS: Params = Params { cycle_size: 4096, additional_cycles: 5 };

impl Params {
    /// Number of most-recent levels guaranteed to remain non-cemented
    /// relative to the head
    pub const fn cemented_limit(&self) -> u64 {
        2 * self.cycle_size - 1
    }

    /// Cycle the level belongs to; genesis belongs to no cycle
    pub const fn cycle_of(&self, level: BlockLevel) -> Option<u64> {
        match level {
            0 => None,
            _ => Some((level - 1) / self.cycle_size),
        }
    }

    /// Zero-based position of the level within its cycle
    pub const fn cycle_position(&self, level: BlockLevel) -> Option<u64> {
        match level {
            0 => None,
            _ => Some((level - 1) % self.cycle_size),
        }
    }

    /// First level of the given cycle
    pub const fn cycle_start(&self, cycle: u64) -> BlockLevel {
        cycle * self.cycle_size + 1
    }

    /// Last level of the given cycle
    pub const fn cycle_end(&self, cycle: u64) -> BlockLevel {
        (cycle + 1) * self.cycle_size
    }

    /// Highest level considered cemented at the given head, if any
    pub const fn cemented_frontier(&self, head_level: BlockLevel) -> Option<BlockLevel> {
        head_level.checked_sub(self.cemented_limit())
    }

    /// The savepoint a pruning store should hold at the given head: the
    /// first level of the oldest kept cycle, or 0 while too few cycles are
    /// fully cemented for anything to be prunable.
    pub fn target_savepoint(&self, head_level: BlockLevel) -> BlockLevel {
        let Some(frontier) = self.cemented_frontier(head_level) else {
            return 0;
        };
        // Cycle c is fully cemented iff cycle_end(c) <= frontier
        let cemented_cycles = frontier / self.cycle_size;
        if cemented_cycles <= self.additional_cycles {
            0
        } else {
            self.cycle_start(cemented_cycles - self.additional_cycles)
        }
    }
}

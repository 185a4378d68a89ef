use crate::db::DB;
use crate::errors::StoreResult;
use std::{path::PathBuf, sync::Arc};

const KB: usize = 1024;
const MB: usize = 1024 * KB;

/// Connection options for a rocksdb instance. Defaults fit a single
/// modestly-sized store; the daemon raises parallelism to the core count.
#[derive(Debug, Clone)]
pub struct ConnBuilder {
    db_path: PathBuf,
    create_if_missing: bool,
    parallelism: usize,
    mem_budget: usize,
}

impl ConnBuilder {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path, create_if_missing: true, parallelism: 1, mem_budget: 64 * MB }
    }

    pub fn with_create_if_missing(self, create_if_missing: bool) -> Self {
        Self { create_if_missing, ..self }
    }

    pub fn with_parallelism(self, parallelism: impl Into<usize>) -> Self {
        Self { parallelism: parallelism.into(), ..self }
    }

    pub fn with_default_parallelism(self) -> Self {
        Self { parallelism: num_cpus::get(), ..self }
    }

    pub fn with_mem_budget(self, mem_budget: impl Into<usize>) -> Self {
        Self { mem_budget: mem_budget.into(), ..self }
    }

    pub fn build(self) -> StoreResult<Arc<DB>> {
        let mut opts = rocksdb::Options::default();
        if self.parallelism > 1 {
            opts.increase_parallelism(self.parallelism as i32);
        }
        opts.optimize_level_style_compaction(self.mem_budget);
        opts.create_if_missing(self.create_if_missing);
        let db = Arc::new(DB::open(&opts, &self.db_path)?);
        Ok(db)
    }
}

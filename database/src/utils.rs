use crate::{
    db::{ConnBuilder, DB},
    errors::StoreResult,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Returns a managed temp dir for DB instances created by tests and tools
pub fn get_chainstore_tempdir() -> TempDir {
    tempfile::Builder::new().prefix("chainstore-").tempdir().expect("a temp dir is creatable")
}

/// Binds the lifetime of a temp DB directory to a value: dropping it deletes
/// the directory, so it must outlive all `Arc<DB>` handles cloned from the
/// connection it was created with.
pub struct TempDbLifetime {
    _tempdir: TempDir,
}

impl TempDbLifetime {
    pub fn new(tempdir: TempDir) -> Self {
        Self { _tempdir: tempdir }
    }
}

/// Creates a DB within a managed temp directory. Intended for tests;
/// panics on failure.
pub fn create_temp_db() -> (TempDbLifetime, Arc<DB>) {
    try_create_temp_db().expect("a temp db is creatable")
}

pub fn try_create_temp_db() -> StoreResult<(TempDbLifetime, Arc<DB>)> {
    let tempdir = get_chainstore_tempdir();
    let db = ConnBuilder::new(tempdir.path().to_path_buf()).build()?;
    Ok((TempDbLifetime::new(tempdir), db))
}

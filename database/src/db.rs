use rocksdb::{DBWithThreadMode, MultiThreaded};
use std::path::Path;

pub use conn_builder::ConnBuilder;

mod conn_builder;

/// The DB type used for chainstore stores
pub type DB = DBWithThreadMode<MultiThreaded>;

/// Deletes an existing DB if it exists
pub fn delete_db(db_dir: &Path) -> Result<(), rocksdb::Error> {
    if !db_dir.exists() {
        return Ok(());
    }
    let options = rocksdb::Options::default();
    DB::destroy(&options, db_dir)
}

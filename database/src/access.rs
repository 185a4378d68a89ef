use crate::{cache::Cache, db::DB, errors::StoreError, key::DbKey, writer::DbWriter};

use rocksdb::{Direction, IterateBounds, IteratorMode, ReadOptions};
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::hash_map::RandomState, error::Error, hash::BuildHasher, sync::Arc};

/// A concurrent DB store access with typed caching.
#[derive(Clone)]
pub struct CachedDbAccess<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
{
    db: Arc<DB>,

    // Cache
    cache: Cache<TKey, TData, S>,

    // DB bucket/path
    prefix: Vec<u8>,
}

pub type KeyDataResult<TData> = Result<(Box<[u8]>, TData), Box<dyn Error>>;

impl<TKey, TData, S> CachedDbAccess<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
    S: BuildHasher + Default,
{
    pub fn new(db: Arc<DB>, cache_size: u64, prefix: Vec<u8>) -> Self {
        Self { db, cache: Cache::new(cache_size), prefix }
    }

    pub fn read_from_cache(&self, key: TKey) -> Option<TData> {
        self.cache.get(&key)
    }

    pub fn has(&self, key: TKey) -> Result<bool, StoreError>
    where
        TKey: AsRef<[u8]>,
    {
        Ok(self.cache.contains_key(&key) || self.db.get_pinned(DbKey::new(&self.prefix, &key))?.is_some())
    }

    pub fn read(&self, key: TKey) -> Result<TData, StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: DeserializeOwned, // We need `DeserializeOwned` since the slice coming from `db.get_pinned` has short lifetime
    {
        if let Some(data) = self.cache.get(&key) {
            Ok(data)
        } else {
            let db_key = DbKey::new(&self.prefix, &key);
            if let Some(slice) = self.db.get_pinned(&db_key)? {
                let data: TData = bincode::deserialize(&slice)?;
                self.cache.insert(key, data.clone());
                Ok(data)
            } else {
                Err(StoreError::KeyNotFound(db_key))
            }
        }
    }

    pub fn write(&self, mut writer: impl DbWriter, key: TKey, data: TData) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: Serialize,
    {
        let bin_data = bincode::serialize(&data)?;
        self.cache.insert(key.clone(), data);
        writer.put(DbKey::new(&self.prefix, &key), bin_data)?;
        Ok(())
    }

    pub fn delete(&self, mut writer: impl DbWriter, key: TKey) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
    {
        self.cache.remove(&key);
        writer.delete(DbKey::new(&self.prefix, &key))?;
        Ok(())
    }

    /// Deletes all entries with keys in `[from, to)`. The typed cache cannot
    /// enumerate the affected keys cheaply, so it is cleared wholesale.
    pub fn delete_range(&self, mut writer: impl DbWriter, from: TKey, to: TKey) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
    {
        self.cache.remove_all();
        writer.delete_range(DbKey::new(&self.prefix, &from), DbKey::new(&self.prefix, &to))?;
        Ok(())
    }

    /// Deletes all entries in the store using the underlying rocksdb `delete_range` operation
    pub fn delete_all(&self, mut writer: impl DbWriter) -> Result<(), StoreError> {
        self.cache.remove_all();
        let db_key = DbKey::prefix_only(&self.prefix);
        let (from, to) = rocksdb::PrefixRange(db_key.as_ref()).into_bounds();
        writer.delete_range(from.unwrap(), to.unwrap())?;
        Ok(())
    }

    /// Iterates the full bucket in key order, yielding raw entry keys
    /// (prefix stripped) alongside deserialized values
    pub fn iterator(&self) -> impl Iterator<Item = KeyDataResult<TData>> + '_
    where
        TData: DeserializeOwned,
    {
        let prefix_key = DbKey::prefix_only(&self.prefix);
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_range(rocksdb::PrefixRange(prefix_key.as_ref()));
        self.db.iterator_opt(IteratorMode::From(prefix_key.as_ref(), Direction::Forward), read_opts).map(move |iter_result| {
            match iter_result {
                Ok((key, data_bytes)) => match bincode::deserialize(&data_bytes) {
                    Ok(data) => Ok((key[prefix_key.prefix_len()..].into(), data)),
                    Err(e) => Err(e.into()),
                },
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{create_temp_db, BatchDbWriter, DirectDbWriter};
    use rocksdb::WriteBatch;

    fn level_key(level: u64) -> [u8; 8] {
        level.to_be_bytes()
    }

    #[test]
    fn test_write_read_delete() {
        let (_lifetime, db) = create_temp_db();
        let access: CachedDbAccess<[u8; 8], u64> = CachedDbAccess::new(db.clone(), 2, b"test".to_vec());

        for i in 0..16u64 {
            access.write(DirectDbWriter::new(&db), level_key(i), i * 100).unwrap();
        }
        assert_eq!(access.read(level_key(7)).unwrap(), 700);
        assert_eq!(access.iterator().count(), 16);

        access.delete(DirectDbWriter::new(&db), level_key(7)).unwrap();
        assert!(access.read(level_key(7)).unwrap_err().is_key_not_found());
    }

    #[test]
    fn test_delete_range_follows_level_order() {
        let (_lifetime, db) = create_temp_db();
        let access: CachedDbAccess<[u8; 8], u64> = CachedDbAccess::new(db.clone(), 0, b"test".to_vec());

        for i in 0..16u64 {
            access.write(DirectDbWriter::new(&db), level_key(i), i).unwrap();
        }
        // [4, 12) deleted, bounds exclusive on the right
        access.delete_range(DirectDbWriter::new(&db), level_key(4), level_key(12)).unwrap();
        for i in 0..16u64 {
            assert_eq!(access.has(level_key(i)).unwrap(), !(4..12).contains(&i), "level {i}");
        }
    }

    #[test]
    fn test_delete_all() {
        let (_lifetime, db) = create_temp_db();
        let access: CachedDbAccess<[u8; 8], u64> = CachedDbAccess::new(db.clone(), 2, b"test".to_vec());

        access.write(DirectDbWriter::new(&db), level_key(1), 1).unwrap();
        access.write(DirectDbWriter::new(&db), level_key(2), 2).unwrap();
        assert_eq!(2, access.iterator().count());
        access.delete_all(DirectDbWriter::new(&db)).unwrap();
        assert_eq!(0, access.iterator().count());

        // Batched variant only takes effect when the batch is written
        access.write(DirectDbWriter::new(&db), level_key(3), 3).unwrap();
        let mut batch = WriteBatch::default();
        access.delete_all(BatchDbWriter::new(&mut batch)).unwrap();
        assert_eq!(1, access.iterator().count());
        db.write(batch).unwrap();
        assert_eq!(0, access.iterator().count());
    }
}

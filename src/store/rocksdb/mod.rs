use std::path::Path;
use std::sync::Arc;

use super::{BatchOp, Store, WriteBatch};
use crate::errors::StoreError;

impl From<rocksdb::Error> for StoreError {
    fn from(error: rocksdb::Error) -> Self {
        StoreError::Backend(error.to_string())
    }
}

#[derive(Clone)]
pub struct RocksDB {
    db: Arc<rocksdb::DB>,
}

impl RocksDB {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut options = rocksdb::Options::default();
        options.set_compression_type(rocksdb::DBCompressionType::Lz4);
        options.increase_parallelism(2);
        options.set_max_background_jobs(4);
        options.create_if_missing(true);

        let db = rocksdb::DB::open(&options, path.as_ref())?;
        tracing::info!("Opened RocksDB store at {}", path.as_ref().display());

        Ok(Self { db: Arc::new(db) })
    }
}

impl Store for RocksDB {
    type Iter<'a> = RocksDBIter<'a> where Self: 'a;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.put(key, value).map_err(Into::into)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db.get(key).map_err(Into::into)
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.db.delete(key).map_err(Into::into)
    }

    fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => rocks_batch.put(key, value),
                BatchOp::Delete { key } => rocks_batch.delete(key),
            }
        }
        self.db.write(rocks_batch).map_err(Into::into)
    }

    fn iter<'a>(&'a self, prefix: &[u8]) -> Result<Self::Iter<'a>, StoreError> {
        Ok(RocksDBIter::new(self.db.prefix_iterator(prefix), prefix))
    }
}

/// Without a prefix extractor configured, RocksDB's prefix iterator only
/// seeks to the prefix; the bound is enforced here.
pub struct RocksDBIter<'a> {
    db_iter: rocksdb::DBRawIterator<'a>,
    prefix: Box<[u8]>,
}

impl<'a> RocksDBIter<'a> {
    pub fn new(db_iter: rocksdb::DBIterator<'a>, prefix: &[u8]) -> Self {
        Self {
            db_iter: db_iter.into(),
            prefix: prefix.into(),
        }
    }
}

impl<'a> Iterator for RocksDBIter<'a> {
    type Item = (Box<[u8]>, Box<[u8]>);

    fn next(&mut self) -> Option<Self::Item> {
        if !self.db_iter.valid() {
            return None;
        }

        let (key, value) = self.db_iter.item()?;
        if !key.starts_with(&self.prefix) {
            return None;
        }

        let (key, value) = (
            key.to_vec().into_boxed_slice(),
            value.to_vec().into_boxed_slice(),
        );
        self.db_iter.next();

        Some((key, value))
    }
}

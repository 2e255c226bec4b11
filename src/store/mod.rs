pub mod articles;
pub mod batch;
pub mod iter;
pub mod map;
pub mod memory;
#[cfg(feature = "rocks")]
pub mod rocksdb;

pub use articles::{ArticleStore, LocalArticleStore};
pub use batch::{BatchOp, WriteBatch};
pub use map::StoreMap;
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::StoreError;

/// Byte-oriented embedded key-value storage.
///
/// Implementations are cheap handles onto a shared database, so cloning one
/// does not copy any data.
pub trait Store: Clone + Send + Sync {
    type Iter<'a>: Iterator<Item = (Box<[u8]>, Box<[u8]>)>
    where
        Self: 'a;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Applies every operation of `batch` atomically: after a failure none of
    /// them is visible.
    fn write(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Iterates the entries whose key starts with `prefix`, in ascending key
    /// order.
    fn iter<'a>(&'a self, prefix: &[u8]) -> Result<Self::Iter<'a>, StoreError>;

    fn open_map<K: Serialize + DeserializeOwned, V: Serialize + DeserializeOwned>(
        &self,
        prefix: impl AsRef<str>,
    ) -> StoreMap<K, V, Self>
    where
        Self: Sized,
    {
        StoreMap::new(self.clone(), prefix)
    }
}

#[cfg(feature = "rocks")]
pub type LocalStore = crate::store::rocksdb::RocksDB;

#[cfg(not(feature = "rocks"))]
pub type LocalStore = crate::store::memory::MemoryStore;

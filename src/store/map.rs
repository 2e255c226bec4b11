use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use super::{iter::MapIter, Store, WriteBatch};
use crate::errors::StoreError;

/// A typed view over the entries of a [`Store`] sharing one key prefix.
///
/// Keys and values are bincode-encoded, so fixed-size keys such as
/// `[u8; N]` keep their byte order and can be used for ordered scans.
#[derive(Clone)]
pub struct StoreMap<K: Serialize + DeserializeOwned, V: Serialize + DeserializeOwned, S: Store> {
    prefix: Box<[u8]>,
    store: S,
    phantom: PhantomData<(K, V)>,
}

impl<K: Serialize + DeserializeOwned, V: Serialize + DeserializeOwned, S: Store> StoreMap<K, V, S> {
    pub fn new(store: S, prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: prefix.as_ref().as_bytes().to_vec().into_boxed_slice(),
            store,
            phantom: PhantomData,
        }
    }

    fn key_bytes(&self, key: &K) -> Result<Vec<u8>, StoreError> {
        let key = bincode::serialize(key)?;
        Ok([&self.prefix, key.as_slice()].concat())
    }

    pub fn insert(&self, key: &K, value: &V) -> Result<(), StoreError> {
        let value = bincode::serialize(value)?;
        self.store.put(&self.key_bytes(key)?, &value)
    }

    pub fn get(&self, key: &K) -> Result<Option<V>, StoreError> {
        match self.store.get(&self.key_bytes(key)?)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &K) -> Result<bool, StoreError> {
        Ok(self.store.get(&self.key_bytes(key)?)?.is_some())
    }

    pub fn remove(&self, key: &K) -> Result<(), StoreError> {
        self.store.delete(&self.key_bytes(key)?)
    }

    /// Queues an insert into `batch` instead of writing it right away.
    pub fn insert_in(
        &self,
        batch: &mut WriteBatch,
        key: &K,
        value: &V,
    ) -> Result<(), StoreError> {
        batch.put(self.key_bytes(key)?, bincode::serialize(value)?);
        Ok(())
    }

    pub fn remove_in(&self, batch: &mut WriteBatch, key: &K) -> Result<(), StoreError> {
        batch.delete(self.key_bytes(key)?);
        Ok(())
    }

    pub fn iter(&self) -> Result<MapIter<K, V, S::Iter<'_>>, StoreError> {
        let iter = self.store.iter(&self.prefix)?;
        Ok(MapIter::new(&self.prefix, iter))
    }
}

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{BatchOp, Store, WriteBatch};
use crate::errors::StoreError;

type Entries = BTreeMap<Box<[u8]>, Box<[u8]>>;

/// Non-persistent [`Store`] backed by an ordered map. Used in tests and when
/// the crate is built without the `rocks` feature.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl Store for MemoryStore {
    type Iter<'a> = std::vec::IntoIter<(Box<[u8]>, Box<[u8]>)> where Self: 'a;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.lock()?.insert(key.into(), value.into());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock()?.get(key).map(|value| value.to_vec()))
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    // One lock for the whole batch, so readers see all of it or none.
    fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    // Snapshot of the matching range; later writes are not observed.
    fn iter<'a>(&'a self, prefix: &[u8]) -> Result<Self::Iter<'a>, StoreError> {
        let entries = self.lock()?;

        Ok(entries
            .range::<[u8], _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<Vec<_>>()
            .into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_is_ordered_and_bounded_by_prefix() {
        let store = MemoryStore::new();
        store.put(b"a/2", b"two").unwrap();
        store.put(b"a/1", b"one").unwrap();
        store.put(b"b/1", b"other").unwrap();

        let keys: Vec<_> = store.iter(b"a/").unwrap().map(|(key, _)| key.to_vec()).collect();
        assert_eq!(keys, vec![b"a/1".to_vec(), b"a/2".to_vec()]);
    }

    #[test]
    fn clones_share_entries() {
        let store = MemoryStore::new();
        let clone = store.clone();
        clone.put(b"k", b"v").unwrap();

        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        store.delete(b"k").unwrap();
        assert_eq!(clone.get(b"k").unwrap(), None);
    }

    #[test]
    fn batch_applies_puts_and_deletes_together() {
        let store = MemoryStore::new();
        store.put(b"old", b"x").unwrap();

        let mut batch = WriteBatch::new();
        batch.put(b"a".to_vec(), b"1".to_vec());
        batch.put(b"b".to_vec(), b"2".to_vec());
        batch.delete(b"old".to_vec());
        store.write(batch).unwrap();

        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.get(b"old").unwrap(), None);
    }

    #[test]
    fn poisoned_lock_fails_reads_instead_of_looking_empty() {
        let store = MemoryStore::new();
        store.put(b"a/1", b"one").unwrap();

        let entries = store.entries.clone();
        let _ = std::thread::spawn(move || {
            let _guard = entries.lock().unwrap();
            panic!("writer crashed");
        })
        .join();

        assert!(matches!(store.iter(b"a/"), Err(StoreError::Backend(_))));
        assert!(store.get(b"a/1").is_err());
    }
}

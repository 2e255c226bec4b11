use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::trace;

/// Decodes the raw entries of a prefix scan. Entries that fail to decode are
/// skipped.
pub struct MapIter<K, V, I>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
    I: Iterator<Item = (Box<[u8]>, Box<[u8]>)>,
{
    prefix_len: usize,
    iter: I,
    phantom: PhantomData<(K, V)>,
}

impl<K, V, I> MapIter<K, V, I>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
    I: Iterator<Item = (Box<[u8]>, Box<[u8]>)>,
{
    pub fn new(prefix: &[u8], iter: I) -> Self {
        Self {
            prefix_len: prefix.len(),
            iter,
            phantom: PhantomData,
        }
    }
}

impl<K, V, I> Iterator for MapIter<K, V, I>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
    I: Iterator<Item = (Box<[u8]>, Box<[u8]>)>,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        for (key, value) in self.iter.by_ref() {
            let Some(key_bytes) = key.get(self.prefix_len..) else {
                continue;
            };

            let key = match bincode::deserialize(key_bytes) {
                Ok(key) => key,
                Err(e) => {
                    trace!("Store Iter deserialize(key) error: {e}");
                    continue;
                }
            };

            let value = match bincode::deserialize(&value) {
                Ok(value) => value,
                Err(e) => {
                    trace!("Store Iter deserialize(value) error: {e}");
                    continue;
                }
            };

            return Some((key, value));
        }

        None
    }
}

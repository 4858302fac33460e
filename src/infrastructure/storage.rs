//! Storage implementations for the limiter registry.
//!
//! Provides concurrent, sharded, append-only storage.

use crate::application::ports::Storage;
use ahash::RandomState;
use dashmap::DashMap;
use std::hash::Hash;

/// Thread-safe sharded storage backed by DashMap.
///
/// Each shard is guarded by its own reader/writer lock, so lookups for
/// different keys rarely contend and lookups for the same key only take a
/// shared lock.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, V, RandomState>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new sharded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Check if a key exists.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Get a clone of a value by borrowed key.
    pub fn get_cloned<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// Implement the Storage port
impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync + std::fmt::Debug,
{
    fn get(&self, key: &K) -> Option<V> {
        self.get_cloned(key)
    }

    fn insert_if_absent(&self, key: K, value: V) -> V {
        // The entry API holds the shard's write lock, making the re-check and
        // the insert one atomic step.
        self.map.entry(key).or_insert(value).value().clone()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for entry in self.map.iter() {
            f(entry.key(), entry.value());
        }
    }
}

// Implement Storage for Arc<ShardedStorage> to allow it to be used directly
impl<K, V> Storage<K, V> for std::sync::Arc<ShardedStorage<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync + std::fmt::Debug,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn insert_if_absent(&self, key: K, value: V) -> V {
        (**self).insert_if_absent(key, value)
    }

    fn len(&self) -> usize {
        Storage::len(&**self)
    }

    fn is_empty(&self) -> bool {
        Storage::is_empty(&**self)
    }

    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V),
    {
        (**self).for_each(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_if_absent_keeps_first_value() {
        let storage: ShardedStorage<String, u32> = ShardedStorage::new();

        assert_eq!(storage.insert_if_absent("key".to_string(), 1), 1);
        assert_eq!(storage.insert_if_absent("key".to_string(), 2), 1);
        assert_eq!(Storage::get(&storage, &"key".to_string()), Some(1));
        assert_eq!(Storage::len(&storage), 1);
    }

    #[test]
    fn test_get_missing() {
        let storage: ShardedStorage<String, u32> = ShardedStorage::new();
        assert_eq!(Storage::get(&storage, &"missing".to_string()), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_borrowed_lookup() {
        let storage: ShardedStorage<String, u32> = ShardedStorage::new();
        storage.insert_if_absent("key".to_string(), 7);

        assert!(storage.contains_key("key"));
        assert_eq!(storage.get_cloned("key"), Some(7));
        assert_eq!(storage.get_cloned("other"), None);
    }

    #[test]
    fn test_for_each() {
        let storage: ShardedStorage<String, u32> = ShardedStorage::new();
        for i in 0..5 {
            storage.insert_if_absent(format!("key_{}", i), i);
        }

        let mut sum = 0;
        storage.for_each(|_k, v| sum += *v);
        assert_eq!(sum, 10);
    }

    #[test]
    fn test_concurrent_insert_if_absent() {
        use std::thread;

        let storage: Arc<ShardedStorage<String, usize>> = Arc::new(ShardedStorage::new());
        let mut handles = vec![];

        for i in 0..10 {
            let storage_clone = Arc::clone(&storage);
            let handle = thread::spawn(move || {
                let mut winners = vec![];
                for j in 0..100 {
                    winners.push(storage_clone.insert_if_absent(format!("key_{}", j), i));
                }
                winners
            });
            handles.push(handle);
        }

        let results: Vec<Vec<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(Storage::len(&storage), 100);
        // Every thread observed the same winner for each key
        for j in 0..100 {
            let first = results[0][j];
            assert!(results.iter().all(|r| r[j] == first));
        }
    }
}

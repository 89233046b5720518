//! Thread-safe memo table for compiled artifacts.
//!
//! Entries are created lazily on first request and never evicted. Producers
//! run outside the lock, so two threads racing on the same key may both
//! compute; the first to publish wins and every caller receives that value.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

/// Key-to-artifact cache shared across threads.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mapforge_core::GraphCache;
///
/// let cache: GraphCache<&str, usize> = GraphCache::new();
/// let a = cache.get_or_try_insert_with("abc", || Ok::<_, ()>("abc".len())).unwrap();
/// let b = cache.get_or_try_insert_with("abc", || Ok::<_, ()>(0)).unwrap();
///
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(*b, 3);
/// ```
pub struct GraphCache<K, V> {
    entries: RwLock<HashMap<K, Arc<V>>>,
}

impl<K, V> Default for GraphCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> GraphCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Returns the cached value for `key`, producing and publishing it on a
    /// miss.
    ///
    /// A failed producer publishes nothing, so a later call retries.
    pub fn get_or_try_insert_with<T, E>(
        &self,
        key: K,
        produce: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<V>, E>
    where
        T: Into<Arc<V>>,
    {
        if let Some(hit) = self.get(&key) {
            trace!(event = "cache_hit", entries = self.len());
            return Ok(hit);
        }

        let value: Arc<V> = produce()?.into();

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(value)))
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> fmt::Debug for GraphCache<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCache")
            .field("entries", &self.len())
            .finish()
    }
}

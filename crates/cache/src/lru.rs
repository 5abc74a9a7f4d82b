//! The LRU cache itself.

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::future::Future;
use tokio::sync::Mutex;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Invalid configuration: cache capacity must be greater than 1 (got {capacity})")]
    InvalidConfiguration { capacity: usize },
}

/// A fixed-capacity cache keyed by opaque strings.
///
/// Eviction is strict LRU by access order: `get`, a hit in
/// `get_or_compute`, and `insert` all move the key to the most-recent end.
///
/// Concurrent misses on the same key are **not** coalesced: each caller runs
/// its own producer, and the last one to finish wins. The lock is never held
/// while a producer runs, so `clear()` does not wait for (or cancel) fills
/// already in flight; those repopulate the cache when they complete.
pub struct BoundedAsyncCache<V> {
    capacity: usize,
    entries: Mutex<Entries<V>>,
}

struct Entries<V> {
    values: HashMap<String, V>,
    /// Front = least recently used.
    order: VecDeque<String>,
}

impl<V> Entries<V> {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn forget(&mut self, key: &str) -> Option<V> {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.values.remove(key)
    }
}

impl<V: Clone> BoundedAsyncCache<V> {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// Fails with [`CacheError::InvalidConfiguration`] when `capacity <= 1`.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity <= 1 {
            return Err(CacheError::InvalidConfiguration { capacity });
        }
        Ok(Self {
            capacity,
            entries: Mutex::new(Entries {
                values: HashMap::with_capacity(capacity + 1),
                order: VecDeque::with_capacity(capacity + 1),
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a key, marking it most recently used on a hit.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let value = entries.values.get(key).cloned()?;
        entries.touch(key);
        trace!(key, "cache hit");
        Some(value)
    }

    /// Whether a key is cached. Does not affect recency.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.values.contains_key(key)
    }

    /// Store a value, evicting the least recently used entry on overflow.
    pub async fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut entries = self.entries.lock().await;
        entries.forget(&key);
        entries.values.insert(key.clone(), value);
        entries.order.push_back(key);

        while entries.order.len() > self.capacity {
            if let Some(evicted) = entries.order.pop_front() {
                entries.values.remove(&evicted);
                debug!(key = %evicted, "evicted least recently used entry");
            }
        }
    }

    /// Return the cached value or fill it from `producer`.
    ///
    /// A producer returning `None` caches nothing and yields `None`.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, producer: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<V>>,
    {
        let filled: Result<Option<V>, Infallible> = self
            .get_or_try_compute(key, move || async move { Ok(producer().await) })
            .await;
        match filled {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but the producer may
    /// fail. Errors are returned as-is and nothing is cached.
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: &str, producer: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(Some(value));
        }

        trace!(key, "cache miss, running producer");
        let Some(value) = producer().await? else {
            return Ok(None);
        };

        self.insert(key, value.clone()).await;
        Ok(Some(value))
    }

    /// Remove one entry. Returns `true` if it was present.
    pub async fn delete(&self, key: &str) -> bool {
        self.entries.lock().await.forget(key).is_some()
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        entries.values.clear();
        entries.order.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

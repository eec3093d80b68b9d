use bincode::config::{Configuration, Fixint, LittleEndian};
use bincode::error::EncodeError;
use log::debug;
use serde::Serialize;
use std::collections::{hash_map::Entry, HashMap};
use std::future::Future;
use thiserror::Error;
use tokio::sync::Mutex;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

#[derive(Debug, Error)]
#[error("Failed to encode cache key")]
pub struct CacheKeyError(#[source] Box<EncodeError>);

/// Memoizes query results by their arguments for the lifetime of the process.
///
/// Keys are the bincode encoding of the arguments, so any `Serialize` value works as a
/// key. Arguments that should hit the same entry must encode identically (use ordered
/// collections). Entries are never invalidated: the underlying data does not change
/// while the process runs.
pub struct QueryCache<V> {
    name: &'static str,
    entries: Mutex<HashMap<Vec<u8>, V>>,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, or runs `load` and caches its result.
    ///
    /// Failed loads are not cached.
    pub async fn get_or_try_load<K, F, Fut, E>(&self, key: &K, load: F) -> Result<V, E>
    where
        K: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: From<CacheKeyError>,
    {
        let key = bincode::serde::encode_to_vec(key, BINCODE_CONFIG)
            .map_err(|e| CacheKeyError(Box::new(e)))?;

        // Fast path
        {
            let entries = self.entries.lock().await;
            if let Some(value) = entries.get(&key) {
                debug!("{} cache hit", self.name);
                return Ok(value.clone());
            }
        }

        // Slow path, the lock is not held while loading
        let loaded = load().await?;

        let mut entries = self.entries.lock().await;
        let value = match entries.entry(key) {
            // Loaded concurrently by another caller, keep theirs.
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => entry.insert(loaded).clone(),
        };
        debug!("{} cache holds {} entries", self.name, entries.len());
        Ok(value)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

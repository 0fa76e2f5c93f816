//! Cached Loader Module
//!
//! Single-flight, memoized fetch-and-cache for rarely changing resources
//! such as configuration or reference data.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{OpsError, Result, TransportError};
use crate::loader::entry::CacheEntry;
use crate::loader::LoaderStats;

// == Fetch Capability ==
/// Produces the value for a key, typically over the network or from disk.
#[async_trait]
pub trait Fetch<K, V>: Send + Sync {
    async fn fetch(&self, key: &K) -> std::result::Result<V, TransportError>;
}

struct LoaderState<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    stats: LoaderStats,
}

// == Cached Loader ==
/// Caches fetched values per key with at most one fetch in flight per key.
///
/// Concurrent `get`s for a key that is loading attach to the running fetch
/// and all observe its outcome. Failures are not cached. The fetch runs on
/// its own task, so a requester that stops waiting neither cancels it nor
/// strands the other requesters.
pub struct CachedLoader<K, V> {
    fetcher: Arc<dyn Fetch<K, V>>,
    state: Arc<Mutex<LoaderState<K, V>>>,
}

impl<K, V> Clone for CachedLoader<K, V> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            state: self.state.clone(),
        }
    }
}

impl<K, V> CachedLoader<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    pub fn new(fetcher: Arc<dyn Fetch<K, V>>) -> Self {
        Self {
            fetcher,
            state: Arc::new(Mutex::new(LoaderState {
                entries: HashMap::new(),
                stats: LoaderStats::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Get ==
    /// Returns the cached value for `key`, fetching it if needed.
    pub async fn get(&self, key: K) -> Result<V> {
        let rx = {
            let mut guard = self.lock();
            let LoaderState { entries, stats } = &mut *guard;
            let entry = entries.entry(key.clone()).or_default();

            if let Some(value) = entry.value() {
                stats.record_hit();
                return Ok(value.clone());
            }

            stats.record_miss();
            let (tx, rx) = oneshot::channel();
            if entry.attach(tx) {
                stats.record_fetch();
                debug!(key = ?key, "Starting fetch");
                self.spawn_fetch(key.clone());
            } else {
                debug!(key = ?key, "Joining in-flight fetch");
            }
            rx
        };

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(OpsError::FetchFailure(TransportError::new(
                "fetch ended without a result",
            ))),
        }
    }

    fn spawn_fetch(&self, key: K) {
        let fetcher = self.fetcher.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            let fetch_key = key.clone();
            let fetch = tokio::spawn(async move { fetcher.fetch(&fetch_key).await });

            let result = match fetch.await {
                Ok(result) => result.map_err(OpsError::FetchFailure),
                Err(err) => Err(OpsError::FetchFailure(TransportError::new(format!(
                    "fetch task failed: {}",
                    err
                )))),
            };

            let waiters = {
                let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
                let LoaderState { entries, stats } = &mut *guard;
                let entry = entries.entry(key.clone()).or_default();
                let waiters = entry.complete(&result);

                if let Err(err) = &result {
                    stats.record_failure();
                    warn!(key = ?key, error = %err, "Fetch failed");
                }
                if entry.is_vacant() {
                    entries.remove(&key);
                }
                waiters
            };

            for waiter in waiters {
                // A requester that stopped waiting has dropped its receiver.
                let _ = waiter.send(result.clone());
            }
        });
    }

    // == Peek ==
    /// Returns the cached value without fetching.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.lock().entries.get(key).and_then(|e| e.value().cloned())
    }

    /// When the cached value for `key` was stored.
    pub fn loaded_at(&self, key: &K) -> Option<DateTime<Utc>> {
        self.lock().entries.get(key).and_then(|e| e.loaded_at())
    }

    pub fn is_loading(&self, key: &K) -> bool {
        self.lock().entries.get(key).is_some_and(|e| e.is_loading())
    }

    // == Invalidate ==
    /// Clears the cached value for `key` so the next `get` fetches again.
    ///
    /// A fetch already in flight is not cancelled and still stores its result
    /// when it completes.
    pub fn invalidate(&self, key: &K) -> bool {
        let mut guard = self.lock();
        let Some(entry) = guard.entries.get_mut(key) else {
            return false;
        };
        let cleared = entry.invalidate();
        if entry.is_vacant() {
            guard.entries.remove(key);
        }
        debug!(key = ?key, cleared, "Invalidated");
        cleared
    }

    /// Clears every cached value. Returns how many were dropped.
    pub fn invalidate_all(&self) -> usize {
        let mut guard = self.lock();
        let cleared = guard
            .entries
            .values_mut()
            .filter_map(|e| e.invalidate().then_some(()))
            .count();
        guard.entries.retain(|_, e| !e.is_vacant());
        cleared
    }

    // == Stats ==
    pub fn stats(&self) -> LoaderStats {
        let guard = self.lock();
        let mut stats = guard.stats.clone();
        stats.cached_entries = guard.entries.values().filter(|e| e.value().is_some()).count();
        stats
    }
}

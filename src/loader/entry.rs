//! Loader Entry Module
//!
//! Per-key state of the cached loader: the stored value and the requesters
//! waiting on an in-flight fetch.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::error::Result;

/// Completion channel for one requester attached to a fetch.
pub(crate) type Waiter<V> = oneshot::Sender<Result<V>>;

// == Cache Entry ==
/// State for a single key.
///
/// `waiters` is `Some` exactly while a fetch is running, so at most one fetch
/// can be in flight per entry.
#[derive(Debug)]
pub(crate) struct CacheEntry<V> {
    value: Option<V>,
    loaded_at: Option<DateTime<Utc>>,
    waiters: Option<Vec<Waiter<V>>>,
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self {
            value: None,
            loaded_at: None,
            waiters: None,
        }
    }
}

impl<V: Clone> CacheEntry<V> {
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn is_loading(&self) -> bool {
        self.waiters.is_some()
    }

    /// True when the entry holds neither a value nor a running fetch.
    pub fn is_vacant(&self) -> bool {
        self.value.is_none() && self.waiters.is_none()
    }

    // == Attach ==
    /// Registers a requester. Returns true if the caller must start the fetch.
    pub fn attach(&mut self, waiter: Waiter<V>) -> bool {
        match self.waiters.as_mut() {
            Some(waiters) => {
                waiters.push(waiter);
                false
            }
            None => {
                self.waiters = Some(vec![waiter]);
                true
            }
        }
    }

    // == Complete ==
    /// Applies a finished fetch and hands back everyone waiting on it.
    ///
    /// A success overwrites whatever value is present, including one cleared
    /// by `invalidate` while the fetch was running. A failure leaves no value.
    pub fn complete(&mut self, result: &Result<V>) -> Vec<Waiter<V>> {
        match result {
            Ok(value) => {
                self.value = Some(value.clone());
                self.loaded_at = Some(Utc::now());
            }
            Err(_) => {
                self.value = None;
                self.loaded_at = None;
            }
        }
        self.waiters.take().unwrap_or_default()
    }

    // == Invalidate ==
    /// Drops the cached value. A running fetch is left alone.
    pub fn invalidate(&mut self) -> bool {
        self.loaded_at = None;
        self.value.take().is_some()
    }
}

//! Loader Statistics Module
//!
//! Tracks loader effectiveness: cache hits, misses, fetches and failures.

use serde::Serialize;

// == Loader Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoaderStats {
    /// Requests answered from the cache
    pub hits: u64,
    /// Requests that had to wait for a fetch
    pub misses: u64,
    /// Fetches actually issued
    pub fetches: u64,
    /// Fetches that failed
    pub failures: u64,
    /// Keys currently holding a value
    pub cached_entries: usize,
}

impl LoaderStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Misses that joined a fetch someone else started.
    pub fn coalesced(&self) -> u64 {
        self.misses.saturating_sub(self.fetches)
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(LoaderStats::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = LoaderStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_coalesced_misses() {
        let mut stats = LoaderStats::new();
        for _ in 0..5 {
            stats.record_miss();
        }
        stats.record_fetch();
        assert_eq!(stats.coalesced(), 4);
    }
}

// Local cache store for the featured-hotels section.
// The orchestrator only sees the `FeaturedCache` interface; freshness is a pure
// function of the entry timestamp so it can be tested without waiting.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

pub const FEATURED_CACHE_KEY: &str = "featured_hotels";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

impl CacheEntry {
    pub fn new(timestamp: DateTime<Utc>, data: Value) -> Self {
        Self { timestamp, data }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        is_fresh(now, self.timestamp, ttl)
    }
}

// An entry stamped in the future (clock skew) counts as fresh
pub fn is_fresh(now: DateTime<Utc>, timestamp: DateTime<Utc>, ttl: Duration) -> bool {
    now - timestamp < ttl
}

// Key/value store the orchestrator reads and writes
pub trait FeaturedCache: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<CacheEntry>;

    fn set(&self, key: &str, entry: CacheEntry);

    // Returns true if an entry was removed
    fn remove(&self, key: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub write_count: AtomicUsize,
    pub removal_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub write_count: usize,
    pub removal_count: usize,
}

// Session-scoped store, dropped with the process
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
    stats: CacheStats,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.entries.len(),
            hit_count: self.stats.hit_count.load(Ordering::SeqCst),
            miss_count: self.stats.miss_count.load(Ordering::SeqCst),
            write_count: self.stats.write_count.load(Ordering::SeqCst),
            removal_count: self.stats.removal_count.load(Ordering::SeqCst),
        }
    }
}

impl FeaturedCache for InMemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.entries.get(key) {
            Some(entry) => {
                self.stats.hit_count.fetch_add(1, Ordering::SeqCst);
                Some(entry.value().clone())
            }
            None => {
                self.stats.miss_count.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    fn set(&self, key: &str, entry: CacheEntry) {
        debug!("Storing cache entry {} stamped {}", key, entry.timestamp);
        self.entries.insert(key.to_string(), entry);
        self.stats.write_count.fetch_add(1, Ordering::SeqCst);
    }

    fn remove(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.removal_count.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }
}

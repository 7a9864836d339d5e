//! Short-lived result cache keyed by the serialised request.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use super::options::QueryResult;

struct CacheEntry {
    stored_at: Instant,
    result: QueryResult,
}

pub struct QueryCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// A fresh entry, if any. Expired entries are dropped on the way out.
    pub fn get(&self, key: &str) -> Option<QueryResult> {
        if let Some(entry) = self.entries.get(key) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.result.clone());
            }
        }
        if self.entries.remove_if(key, |_, e| e.stored_at.elapsed() >= self.ttl).is_some() {
            debug!("cache entry expired");
        }
        None
    }

    pub fn insert(&self, key: String, result: QueryResult) {
        self.entries.insert(key, CacheEntry {
            stored_at: Instant::now(),
            result,
        });
    }

    /// Periodic cleanup so abandoned keys do not accumulate.
    pub fn evict_expired(&self) {
        self.entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Raw-listing cache keyed by normalized query + filters.
//!
//! Entries are immutable `Arc`s swapped in whole under the write lock, so a
//! reader sees either the previous entry or the complete new one.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::market_listing::MarketListing;
use crate::domain::values::market_filters::MarketFilters;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Lower-cased, whitespace-collapsed query plus the canonical filter string.
    pub fn new(query: &str, filters: &MarketFilters) -> Self {
        let normalized = query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        CacheKey(format!("{normalized}|{}", filters.canonical()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct CacheEntry {
    pub listings: Vec<MarketListing>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub ttl_secs: u64,
    pub oldest_fetch: Option<DateTime<Utc>>,
}

pub struct ListingCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Most recent entry for `key`, fresh or stale.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.get(key).cloned()
    }

    /// Entry for `key` only if younger than the TTL.
    pub fn get_fresh(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Arc<CacheEntry>> {
        self.get(key).filter(|entry| entry.is_fresh(now, self.ttl))
    }

    pub fn insert(&self, key: CacheKey, listings: Vec<MarketListing>, fetched_at: DateTime<Utc>) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry {
            listings,
            fetched_at,
        });
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        entries.insert(key, Arc::clone(&entry));
        entry
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        CacheStats {
            entries: entries.len(),
            ttl_secs: self.ttl.as_secs(),
            oldest_fetch: entries.values().map(|e| e.fetched_at).min(),
        }
    }
}

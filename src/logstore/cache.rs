//! Time-bounded result cache
//!
//! Holds search pages and the service-list view. Each entry expires on its
//! own TTL. The only invalidation path besides expiry is `flush_all()`,
//! which retention cleanup calls after every delete.

use super::filter::FilterKey;
use super::query::SearchPage;
use super::stats::ServiceSummary;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// TTL for cached search pages
pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(60);

/// TTL for the cached service list
pub const DEFAULT_SERVICE_LIST_TTL: Duration = Duration::from_secs(300);

/// Cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Search(FilterKey),
    ServiceList,
}

/// Cached value, shared without copying the underlying rows
#[derive(Debug, Clone)]
pub enum CachedResult {
    Search(Arc<SearchPage>),
    ServiceList(Arc<Vec<ServiceSummary>>),
}

#[derive(Debug)]
struct CacheSlot {
    value: CachedResult,
    expires_at: Instant,
}

/// In-process TTL cache
#[derive(Debug)]
pub struct ResultCache {
    entries: DashMap<CacheKey, CacheSlot>,
    search_ttl: Duration,
    service_list_ttl: Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_TTL, DEFAULT_SERVICE_LIST_TTL)
    }
}

impl ResultCache {
    pub fn new(search_ttl: Duration, service_list_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            search_ttl,
            service_list_ttl,
        }
    }

    /// Look up a live entry; an expired entry is removed and reported absent
    pub fn get(&self, key: &CacheKey) -> Option<CachedResult> {
        let now = Instant::now();

        if let Some(slot) = self.entries.get(key) {
            if now < slot.expires_at {
                return Some(slot.value.clone());
            }
        } else {
            return None;
        }

        self.entries.remove_if(key, |_, slot| now >= slot.expires_at);
        None
    }

    pub fn set(&self, key: CacheKey, value: CachedResult, ttl: Duration) {
        self.entries.insert(
            key,
            CacheSlot {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn get_search(&self, key: &FilterKey) -> Option<Arc<SearchPage>> {
        match self.get(&CacheKey::Search(key.clone()))? {
            CachedResult::Search(page) => Some(page),
            CachedResult::ServiceList(_) => None,
        }
    }

    pub fn set_search(&self, key: FilterKey, page: Arc<SearchPage>) {
        self.set(CacheKey::Search(key), CachedResult::Search(page), self.search_ttl);
    }

    pub fn get_service_list(&self) -> Option<Arc<Vec<ServiceSummary>>> {
        match self.get(&CacheKey::ServiceList)? {
            CachedResult::ServiceList(services) => Some(services),
            CachedResult::Search(_) => None,
        }
    }

    pub fn set_service_list(&self, services: Arc<Vec<ServiceSummary>>) {
        self.set(
            CacheKey::ServiceList,
            CachedResult::ServiceList(services),
            self.service_list_ttl,
        );
    }

    /// Drop every entry, search and service list alike
    pub fn flush_all(&self) {
        let flushed = self.entries.len();
        self.entries.clear();
        tracing::debug!(flushed = flushed, "Result cache flushed");
    }

    /// Remove expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| now < slot.expires_at);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Periodically purge expired entries so idle keys do not accumulate
pub fn spawn_purge_task(cache: Arc<ResultCache>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                tracing::debug!(purged = purged, "Purged expired cache entries");
            }
        }
    })
}

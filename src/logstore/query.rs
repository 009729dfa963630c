//! Filtered, paginated log search
//!
//! Results are memoized in the `ResultCache` under the filter's canonical
//! key. A cached page is returned as-is until it expires or retention
//! flushes the cache.

use super::cache::ResultCache;
use super::error::Result;
use super::filter::LogFilter;
use super::model::LogEntry;
use super::storage::LogStorage;
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub items: Vec<LogEntry>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

/// Number of pages needed to show `total` rows at `limit` per page
pub fn total_pages(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit as u64)
}

/// Search executor
pub struct QueryEngine {
    storage: Arc<dyn LogStorage>,
    cache: Arc<ResultCache>,
}

impl QueryEngine {
    pub fn new(storage: Arc<dyn LogStorage>, cache: Arc<ResultCache>) -> Self {
        Self { storage, cache }
    }

    /// Run a filtered search
    ///
    /// Storage errors propagate unchanged; a failed search must be visible.
    pub async fn search(&self, filter: &LogFilter) -> Result<SearchPage> {
        filter.validate()?;

        let key = filter.cache_key();
        if let Some(cached) = self.cache.get_search(&key) {
            metrics::record_cache_lookup("search", true);
            return Ok(cached.as_ref().clone());
        }
        metrics::record_cache_lookup("search", false);

        let start = Instant::now();
        let limit = filter.effective_limit();
        let page = filter.effective_page();

        let items = self.storage.select_entries(&filter.data_statement()).await?;
        let total = self.count(filter).await?;

        let result = SearchPage {
            items,
            page,
            limit,
            total,
            total_pages: total_pages(total, limit),
        };

        let elapsed = start.elapsed();
        tracing::debug!(
            total = result.total,
            returned = result.items.len(),
            page = page,
            limit = limit,
            duration_ms = elapsed.as_millis() as u64,
            "Log search executed"
        );
        metrics::record_search_duration(elapsed);

        self.cache.set_search(key, Arc::new(result.clone()));

        Ok(result)
    }

    async fn count(&self, filter: &LogFilter) -> Result<u64> {
        let rows = self.storage.select_rows(&filter.count_statement()).await?;
        let total = rows
            .first()
            .and_then(|row| row.get("total"))
            .and_then(|value| value.as_u64())
            .unwrap_or(0);
        Ok(total)
    }
}

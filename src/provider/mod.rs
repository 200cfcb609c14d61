//! Market-data provider abstraction
//!
//! The planner core treats quote sources as opaque, fallible collaborators:
//! they return data or they explicitly fail, and per-ticker failures are
//! recovered by the caller. The Yahoo Finance implementation lives in
//! [`yahoo`]; the store and calculators only see the trait.

pub mod yahoo;

use chrono::{Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use tracing::debug;

use crate::calc::{FundFacts, Period};
use crate::error::Result;
use crate::series::PricePoint;

/// What slice of history to fetch: a named lookback period, or everything
/// strictly on/after a date (used by incremental store updates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryRequest {
    Period(Period),
    Since(NaiveDate),
}

/// An external source of price history and fund facts
pub trait MarketDataProvider {
    fn fetch_price_history(
        &self,
        ticker: &str,
        request: HistoryRequest,
    ) -> impl Future<Output = Result<Vec<PricePoint>>> + Send;

    fn fetch_fund_facts(&self, ticker: &str) -> impl Future<Output = Result<FundFacts>> + Send;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    series: Vec<PricePoint>,
    inserted: chrono::DateTime<Utc>,
}

/// Explicit cache over `(ticker, request)` history lookups.
///
/// Entries expire after `ttl` and the cache holds at most `max_entries`,
/// evicting the oldest insertion when full. No hidden global state: callers
/// construct one and inject it via [`CachedProvider`].
pub struct HistoryCache {
    entries: Mutex<HashMap<(String, HistoryRequest), CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for HistoryCache {
    fn default() -> Self {
        Self::new(Duration::hours(24), 64)
    }
}

impl HistoryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    pub fn get(&self, ticker: &str, request: HistoryRequest) -> Option<Vec<PricePoint>> {
        let mut entries = self.entries.lock().unwrap();
        let key = (ticker.to_string(), request);
        let entry = entries.get(&key)?;
        if Utc::now().signed_duration_since(entry.inserted) >= self.ttl {
            entries.remove(&key);
            return None;
        }
        debug!("history cache hit for {} {:?}", ticker, request);
        Some(entry.series.clone())
    }

    pub fn put(&self, ticker: &str, request: HistoryRequest, series: Vec<PricePoint>) {
        let mut entries = self.entries.lock().unwrap();
        let key = (ticker.to_string(), request);
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            // At capacity: evict the oldest insertion
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                series,
                inserted: Utc::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A provider wrapper that serves history from an injected [`HistoryCache`]
/// before hitting the inner source. Fund facts change rarely but cheaply,
/// so they pass straight through.
pub struct CachedProvider<P> {
    inner: P,
    cache: HistoryCache,
}

impl<P: MarketDataProvider + Sync> CachedProvider<P> {
    pub fn new(inner: P, cache: HistoryCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &HistoryCache {
        &self.cache
    }
}

impl<P: MarketDataProvider + Sync> MarketDataProvider for CachedProvider<P> {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        request: HistoryRequest,
    ) -> Result<Vec<PricePoint>> {
        if let Some(series) = self.cache.get(ticker, request) {
            return Ok(series);
        }
        let series = self.inner.fetch_price_history(ticker, request).await?;
        self.cache.put(ticker, request, series.clone());
        Ok(series)
    }

    async fn fetch_fund_facts(&self, ticker: &str) -> Result<FundFacts> {
        self.inner.fetch_fund_facts(ticker).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn point(day: u32, close: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
        }
    }

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl MarketDataProvider for CountingProvider {
        async fn fetch_price_history(
            &self,
            _ticker: &str,
            _request: HistoryRequest,
        ) -> Result<Vec<PricePoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![point(2, 100.0), point(3, 101.0)])
        }

        async fn fetch_fund_facts(&self, ticker: &str) -> Result<FundFacts> {
            Ok(FundFacts {
                symbol: ticker.to_string(),
                ..FundFacts::default()
            })
        }
    }

    #[tokio::test]
    async fn test_cached_provider_serves_repeat_requests_from_cache() {
        let provider = CachedProvider::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            HistoryCache::default(),
        );
        let request = HistoryRequest::Period(Period::Max);

        let first = provider.fetch_price_history("VTI", request).await.unwrap();
        let second = provider.fetch_price_history("VTI", request).await.unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.cache().len(), 1);

        // A different period is a different cache key
        provider
            .fetch_price_history("VTI", HistoryRequest::Period(Period::OneYear))
            .await
            .unwrap();
        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_expires_entries_after_ttl() {
        let cache = HistoryCache::new(Duration::zero(), 8);
        cache.put("VTI", HistoryRequest::Period(Period::Max), vec![point(2, 100.0)]);
        assert_eq!(cache.get("VTI", HistoryRequest::Period(Period::Max)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_evicts_oldest_entry_at_capacity() {
        let cache = HistoryCache::new(Duration::hours(1), 2);
        cache.put("VTI", HistoryRequest::Period(Period::Max), vec![point(2, 1.0)]);
        cache.put("VEA", HistoryRequest::Period(Period::Max), vec![point(2, 2.0)]);
        cache.put("BND", HistoryRequest::Period(Period::Max), vec![point(2, 3.0)]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("BND", HistoryRequest::Period(Period::Max)).is_some());
    }
}

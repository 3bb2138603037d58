//! Market research use case: the resilient gateway in front of the listing
//! source. Fresh cache first, then the circuit breaker around a bounded retry
//! loop, with stale cache as the fallback while the circuit is open.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::entities::market_listing::MarketListing;
use crate::domain::error::DomainError;
use crate::domain::ports::clock::Clock;
use crate::domain::ports::listing_source::{ListingSource, SourceError};
use crate::domain::values::market_filters::MarketFilters;
use crate::domain::values::market_statistics::MarketStatistics;
use crate::infrastructure::resilience::circuit_breaker::{BreakerError, BreakerSnapshot, CircuitBreaker};
use crate::infrastructure::resilience::listing_cache::{CacheEntry, CacheKey, CacheStats, ListingCache};
use crate::infrastructure::resilience::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bound on a single fetch attempt, independent of breaker timers.
    pub fetch_timeout: Duration,
    pub max_result_limit: u32,
    pub min_sample_count: usize,
    pub liquidity_window_days: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            max_result_limit: 100,
            min_sample_count: 5,
            liquidity_window_days: 30,
        }
    }
}

/// Where a snapshot's listings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Cache,
    /// Expired cache served because the circuit is open.
    StaleCache,
}

impl DataSource {
    pub fn is_degraded(&self) -> bool {
        matches!(self, DataSource::StaleCache)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub statistics: MarketStatistics,
    pub source: DataSource,
}

impl MarketSnapshot {
    pub fn is_degraded(&self) -> bool {
        self.source.is_degraded()
    }
}

/// Cache and breaker state in one view.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStats {
    pub cache: CacheStats,
    pub breaker: BreakerSnapshot,
}

pub struct MarketResearchUseCase {
    source: Arc<dyn ListingSource>,
    clock: Arc<dyn Clock>,
    breaker: Arc<CircuitBreaker>,
    cache: Arc<ListingCache>,
    retry: RetryPolicy,
    config: GatewayConfig,
}

impl MarketResearchUseCase {
    pub fn new(
        source: Arc<dyn ListingSource>,
        clock: Arc<dyn Clock>,
        breaker: Arc<CircuitBreaker>,
        cache: Arc<ListingCache>,
        retry: RetryPolicy,
        config: GatewayConfig,
    ) -> Self {
        Self {
            source,
            clock,
            breaker,
            cache,
            retry,
            config,
        }
    }

    /// Statistics for `query` under `filters`.
    ///
    /// Invalid input is rejected before the cache or the source is touched. A
    /// successful fetch of zero listings is a valid, insufficient-data result.
    pub async fn fetch_market_data(&self, query: &str, filters: &MarketFilters) -> Result<MarketSnapshot, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DomainError::InvalidInput("query must not be empty".into()));
        }
        filters.validate(self.config.max_result_limit)?;

        let key = CacheKey::new(query, filters);
        if let Some(entry) = self.cache.get_fresh(&key, self.clock.now()) {
            debug!(key = key.as_str(), "Serving fresh cache entry");
            return Ok(self.snapshot(query, &entry, DataSource::Cache));
        }

        let outcome = self
            .breaker
            .execute(|| self.fetch_with_retry(query, filters))
            .await;

        match outcome {
            Ok(listings) => {
                let entry = self.cache.insert(key, listings, self.clock.now());
                info!(
                    source = self.source.name(),
                    listings = entry.listings.len(),
                    "Fetched market listings"
                );
                Ok(self.snapshot(query, &entry, DataSource::Live))
            }
            Err(BreakerError::Open { retry_after }) => match self.cache.get(&key) {
                Some(entry) => {
                    warn!(
                        key = key.as_str(),
                        age_secs = entry.age(self.clock.now()).as_secs(),
                        "Circuit open, serving stale cache"
                    );
                    Ok(self.snapshot(query, &entry, DataSource::StaleCache))
                }
                None => Err(DomainError::MarketDataUnavailable {
                    query: query.to_string(),
                    cause: Box::new(DomainError::CircuitOpen {
                        dependency: self.breaker.dependency().to_string(),
                        retry_after_secs: ceil_secs(retry_after),
                    }),
                }),
            },
            Err(BreakerError::Call(SourceError::RateLimited(msg))) => Err(DomainError::RateLimitExceeded(msg)),
            Err(BreakerError::Call(e)) => Err(DomainError::MarketDataUnavailable {
                query: query.to_string(),
                cause: Box::new(DomainError::Upstream(e.to_string())),
            }),
        }
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            cache: self.cache.stats(),
            breaker: self.breaker.snapshot(),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Listing cache cleared");
    }

    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }

    /// All retries run inside one breaker admission, so an exhausted budget
    /// counts as a single breaker failure.
    async fn fetch_with_retry(&self, query: &str, filters: &MarketFilters) -> Result<Vec<MarketListing>, SourceError> {
        let timeout = self.config.fetch_timeout;
        self.retry
            .run(self.clock.as_ref(), |attempt| async move {
                debug!(attempt, query, "Fetching listings");
                match tokio::time::timeout(timeout, self.source.fetch(query, filters)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::Timeout(timeout)),
                }
            })
            .await
    }

    /// Derived with `as_of = fetched_at`, so every read of one entry yields
    /// identical statistics.
    fn snapshot(&self, query: &str, entry: &CacheEntry, source: DataSource) -> MarketSnapshot {
        MarketSnapshot {
            statistics: MarketStatistics::from_listings(
                query,
                &entry.listings,
                entry.fetched_at,
                self.config.min_sample_count,
                self.config.liquidity_window_days,
            ),
            source,
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

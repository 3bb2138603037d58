//! Shared test helpers: a manual clock, a scripted listing source and
//! builders for listings and statistics.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cardtrader::application::market_research::{GatewayConfig, MarketResearchUseCase};
use cardtrader::domain::entities::market_listing::MarketListing;
use cardtrader::domain::ports::clock::Clock;
use cardtrader::domain::ports::listing_source::{ListingSource, SourceError};
use cardtrader::domain::values::card_condition::CardCondition;
use cardtrader::domain::values::listing_status::ListingStatus;
use cardtrader::domain::values::market_filters::MarketFilters;
use cardtrader::domain::values::market_statistics::{DataQuality, Liquidity, MarketStatistics};
use cardtrader::infrastructure::resilience::circuit_breaker::{BreakerConfig, CircuitBreaker};
use cardtrader::infrastructure::resilience::listing_cache::ListingCache;
use cardtrader::infrastructure::resilience::retry::RetryPolicy;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

/// Clock that only moves when told to. `sleep` returns immediately but
/// advances time by the requested amount and records it.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap()),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn advance(&self, secs: i64) {
        *self.now.lock().unwrap() += chrono::Duration::seconds(secs);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        *self.now.lock().unwrap() += chrono::Duration::from_std(duration).unwrap();
    }
}

/// Listing source that replays queued outcomes, then repeats a fallback.
pub struct ScriptedSource {
    queue: Mutex<VecDeque<Result<Vec<MarketListing>, SourceError>>>,
    fallback: Mutex<Result<Vec<MarketListing>, SourceError>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(Vec::new())),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, outcome: Result<Vec<MarketListing>, SourceError>) {
        self.queue.lock().unwrap().push_back(outcome);
    }

    pub fn always(&self, outcome: Result<Vec<MarketListing>, SourceError>) {
        *self.fallback.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, _query: &str, _filters: &MarketFilters) -> Result<Vec<MarketListing>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queue.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}

pub fn make_listing(id: &str, price: Decimal, status: ListingStatus, observed_at: DateTime<Utc>) -> MarketListing {
    MarketListing::new(
        id.to_string(),
        format!("2018 Topps Chrome Shohei Ohtani RC #{id}"),
        price,
        CardCondition::Unspecified,
        status,
        observed_at,
        "test".to_string(),
    )
}

/// `sold` sold listings followed by `active` active ones, one hour apart,
/// priced `base`, `base + 1`, ...
pub fn make_listings(sold: usize, active: usize, base: Decimal, now: DateTime<Utc>) -> Vec<MarketListing> {
    (0..sold + active)
        .map(|i| {
            let status = if i < sold { ListingStatus::Sold } else { ListingStatus::Active };
            make_listing(
                &format!("L{i}"),
                base + Decimal::from(i),
                status,
                now - chrono::Duration::hours(i as i64 + 1),
            )
        })
        .collect()
}

pub fn make_stats(mean: Decimal, sample_count: usize, sold: usize, active: usize) -> MarketStatistics {
    MarketStatistics {
        query: "test card".to_string(),
        mean_price: mean,
        median_price: mean,
        std_dev: 0.0,
        min_price: mean,
        max_price: mean,
        sample_count,
        liquidity: Liquidity {
            sold_count: sold,
            active_count: active,
            window_days: 30,
        },
        price_momentum: None,
        data_quality: if sample_count < 5 {
            DataQuality::Insufficient
        } else {
            DataQuality::Sufficient
        },
        as_of: Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap(),
    }
}

/// Short 30s half-open lease so lease expiry is cheap to reach in tests.
pub fn breaker_config(threshold: u32) -> BreakerConfig {
    BreakerConfig {
        failure_threshold: threshold,
        probe_lease: Duration::from_secs(30),
        ..Default::default()
    }
}

pub fn retry_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        ..Default::default()
    }
}

pub struct Gateway {
    pub research: MarketResearchUseCase,
    pub breaker: Arc<CircuitBreaker>,
    pub cache: Arc<ListingCache>,
}

pub fn gateway(source: Arc<ScriptedSource>, clock: Arc<ManualClock>, threshold: u32, max_retries: u32) -> Gateway {
    let breaker = Arc::new(CircuitBreaker::new("scripted", breaker_config(threshold), clock.clone()));
    let cache = Arc::new(ListingCache::new(Duration::from_secs(900)));
    let research = MarketResearchUseCase::new(
        source,
        clock,
        breaker.clone(),
        cache.clone(),
        retry_policy(max_retries),
        GatewayConfig::default(),
    );
    Gateway {
        research,
        breaker,
        cache,
    }
}

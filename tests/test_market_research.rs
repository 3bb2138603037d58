mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cardtrader::application::market_research::{DataSource, GatewayConfig, MarketResearchUseCase};
use cardtrader::config::AppConfig;
use cardtrader::domain::entities::market_listing::MarketListing;
use cardtrader::domain::error::{DomainError, ErrorKind};
use cardtrader::domain::ports::clock::Clock;
use cardtrader::domain::ports::listing_source::{ListingSource, SourceError};
use cardtrader::domain::values::market_filters::MarketFilters;
use cardtrader::infrastructure::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use cardtrader::infrastructure::resilience::listing_cache::ListingCache;
use common::{breaker_config, gateway, make_listings, retry_policy, ManualClock, ScriptedSource};
use rust_decimal_macros::dec;
use tokio::sync::Notify;

const QUERY: &str = "2018 Topps Chrome Shohei Ohtani RC";

#[tokio::test]
async fn test_fresh_cache_hit_skips_source() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    source.push(Ok(make_listings(8, 2, dec!(100), clock.now())));
    let gw = gateway(source.clone(), clock.clone(), 5, 0);
    let filters = MarketFilters::default();

    let first = gw.research.fetch_market_data(QUERY, &filters).await.unwrap();
    assert_eq!(first.source, DataSource::Live);

    clock.advance(600);
    let second = gw.research.fetch_market_data(QUERY, &filters).await.unwrap();
    assert_eq!(second.source, DataSource::Cache);
    assert_eq!(second.statistics, first.statistics);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_cache_key_ignores_case_and_spacing() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    source.always(Ok(make_listings(6, 0, dec!(50), clock.now())));
    let gw = gateway(source.clone(), clock, 5, 0);
    let filters = MarketFilters::default();

    gw.research.fetch_market_data(QUERY, &filters).await.unwrap();
    let again = gw
        .research
        .fetch_market_data("  2018 topps   CHROME shohei ohtani rc ", &filters)
        .await
        .unwrap();
    assert_eq!(again.source, DataSource::Cache);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    source.always(Ok(make_listings(5, 5, dec!(20), clock.now())));
    let gw = gateway(source.clone(), clock.clone(), 5, 0);
    let filters = MarketFilters::default();

    gw.research.fetch_market_data(QUERY, &filters).await.unwrap();
    clock.advance(900);
    let refreshed = gw.research.fetch_market_data(QUERY, &filters).await.unwrap();
    assert_eq!(refreshed.source, DataSource::Live);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_stale_cache_served_while_open() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    source.push(Ok(make_listings(10, 4, dec!(300), clock.now())));
    source.always(Err(SourceError::Network("connection reset".into())));
    let gw = gateway(source.clone(), clock.clone(), 1, 0);
    let filters = MarketFilters::default();

    let live = gw.research.fetch_market_data(QUERY, &filters).await.unwrap();

    clock.advance(901);
    let err = gw.research.fetch_market_data(QUERY, &filters).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MarketDataUnavailable);
    assert!(!err.is_circuit_open());
    assert_eq!(gw.breaker.state(), CircuitState::Open);

    let degraded = gw.research.fetch_market_data(QUERY, &filters).await.unwrap();
    assert_eq!(degraded.source, DataSource::StaleCache);
    assert!(degraded.is_degraded());
    assert_eq!(degraded.statistics, live.statistics);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_open_without_cache_is_unavailable() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    source.always(Err(SourceError::Network("down".into())));
    let gw = gateway(source.clone(), clock, 3, 0);
    let filters = MarketFilters::default();

    for _ in 0..3 {
        let _ = gw.research.fetch_market_data(QUERY, &filters).await;
    }
    assert_eq!(gw.breaker.state(), CircuitState::Open);
    assert_eq!(source.calls(), 3);

    let err = gw.research.fetch_market_data(QUERY, &filters).await.unwrap_err();
    assert_eq!(source.calls(), 3);
    assert!(err.is_circuit_open());
    match err {
        DomainError::MarketDataUnavailable { query, cause } => {
            assert_eq!(query, QUERY);
            assert!(matches!(*cause, DomainError::CircuitOpen { retry_after_secs: 60, .. }));
        }
        other => panic!("expected MarketDataUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_retried_with_backoff() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    source.push(Err(SourceError::RateLimited("429".into())));
    source.push(Err(SourceError::RateLimited("429".into())));
    source.push(Ok(make_listings(6, 0, dec!(40), clock.now())));
    let gw = gateway(source.clone(), clock.clone(), 5, 3);

    let snap = gw
        .research
        .fetch_market_data(QUERY, &MarketFilters::default())
        .await
        .unwrap();
    assert_eq!(snap.statistics.sample_count, 6);
    assert_eq!(source.calls(), 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(500), Duration::from_millis(1000)]);
    assert_eq!(gw.breaker.consecutive_failures(), 0);
}

#[tokio::test]
async fn test_exhausted_retries_count_as_one_failure() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    source.always(Err(SourceError::RateLimited("quota".into())));
    let gw = gateway(source.clone(), clock, 5, 2);

    let err = gw
        .research
        .fetch_market_data(QUERY, &MarketFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::RateLimitExceeded(_)));
    assert_eq!(source.calls(), 3);
    assert_eq!(gw.breaker.consecutive_failures(), 1);
}

#[tokio::test]
async fn test_permanent_error_not_retried() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    source.always(Err(SourceError::Parse("unexpected body".into())));
    let gw = gateway(source.clone(), clock.clone(), 5, 3);

    let err = gw
        .research
        .fetch_market_data(QUERY, &MarketFilters::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MarketDataUnavailable);
    assert_eq!(source.calls(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_zero_listings_is_insufficient_not_error() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    source.push(Ok(vec![]));
    let gw = gateway(source.clone(), clock, 5, 0);

    let snap = gw
        .research
        .fetch_market_data(QUERY, &MarketFilters::default())
        .await
        .unwrap();
    assert_eq!(snap.source, DataSource::Live);
    assert_eq!(snap.statistics.sample_count, 0);
    assert!(snap.statistics.is_insufficient());
    assert_eq!(gw.breaker.consecutive_failures(), 0);
}

#[tokio::test]
async fn test_invalid_input_rejected_before_fetch() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    let gw = gateway(source.clone(), clock, 5, 0);

    let inverted = MarketFilters {
        min_price: Some(dec!(100)),
        max_price: Some(dec!(10)),
        ..Default::default()
    };
    let negative = MarketFilters {
        min_price: Some(dec!(-1)),
        ..Default::default()
    };
    let too_many = MarketFilters {
        limit: 101,
        ..Default::default()
    };
    let zero = MarketFilters {
        limit: 0,
        ..Default::default()
    };

    for filters in [inverted, negative, too_many, zero] {
        let err = gw.research.fetch_market_data(QUERY, &filters).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
    let err = gw
        .research
        .fetch_market_data("   ", &MarketFilters::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let clock = ManualClock::new();
    let source = ScriptedSource::new();
    source.always(Ok(make_listings(5, 0, dec!(10), clock.now())));
    let gw = gateway(source.clone(), clock, 5, 0);
    let filters = MarketFilters::default();

    gw.research.fetch_market_data(QUERY, &filters).await.unwrap();
    let stats = gw.research.stats();
    assert_eq!(stats.cache.entries, 1);
    assert_eq!(stats.breaker.state, CircuitState::Closed);

    gw.research.clear_cache();
    assert!(gw.cache.is_empty());
    gw.research.fetch_market_data(QUERY, &filters).await.unwrap();
    assert_eq!(source.calls(), 2);
}

/// Never answers; only the gateway's fetch timeout ends the call.
struct HangingSource;

#[async_trait]
impl ListingSource for HangingSource {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn fetch(&self, _query: &str, _filters: &MarketFilters) -> Result<Vec<MarketListing>, SourceError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_fetch_timeout_is_breaker_failure() {
    let clock = ManualClock::new();
    let breaker = Arc::new(CircuitBreaker::new("hanging", breaker_config(1), clock.clone()));
    let research = MarketResearchUseCase::new(
        Arc::new(HangingSource),
        clock,
        breaker.clone(),
        Arc::new(ListingCache::new(Duration::from_secs(900))),
        retry_policy(0),
        GatewayConfig {
            fetch_timeout: Duration::from_millis(20),
            ..Default::default()
        },
    );

    let err = research
        .fetch_market_data(QUERY, &MarketFilters::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MarketDataUnavailable);
    assert!(err.to_string().contains("Timed out"));
    assert_eq!(breaker.state(), CircuitState::Open);
}

/// Each attempt costs 20s of clock time. The first fails transiently, later
/// ones block until released. Tracks how many attempts overlap.
struct SlowSource {
    clock: Arc<ManualClock>,
    release: Notify,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowSource {
    fn new(clock: Arc<ManualClock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            release: Notify::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingSource for SlowSource {
    fn name(&self) -> &str {
        "slow"
    }

    async fn fetch(&self, _query: &str, _filters: &MarketFilters) -> Result<Vec<MarketListing>, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let overlapping = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(overlapping, Ordering::SeqCst);
        self.clock.advance(20);

        let out = if call == 0 {
            Err(SourceError::Network("connection reset".into()))
        } else {
            self.release.notified().await;
            Ok(vec![])
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

#[tokio::test]
async fn test_half_open_call_keeps_lease_through_retries() {
    let clock = ManualClock::new();
    let source = SlowSource::new(clock.clone());
    let config = AppConfig {
        breaker_failure_threshold: 1,
        ..Default::default()
    };
    let breaker = Arc::new(CircuitBreaker::new("slow", config.breaker_config(), clock.clone()));
    let research = MarketResearchUseCase::new(
        source.clone(),
        clock.clone(),
        breaker.clone(),
        Arc::new(ListingCache::new(config.cache_ttl())),
        config.retry_policy(),
        config.gateway_config(),
    );

    let _ = breaker.execute(|| async { Err::<(), _>("down") }).await;
    assert_eq!(breaker.state(), CircuitState::Open);
    clock.advance(61);

    let filters = MarketFilters::default();
    let slow = research.fetch_market_data(QUERY, &filters);
    let contender = async {
        while source.calls() < 2 {
            tokio::task::yield_now().await;
        }
        // Over 40s into the half-open call, inside its retry loop.
        let rejected = research.fetch_market_data(QUERY, &filters).await;
        let calls_seen = source.calls();
        source.release.notify_one();
        (rejected, calls_seen)
    };
    let (first, (second, calls_seen)) = tokio::join!(slow, contender);

    let err = second.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MarketDataUnavailable);
    assert!(err.is_circuit_open());
    assert_eq!(calls_seen, 2);

    assert_eq!(first.unwrap().source, DataSource::Live);
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
}

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use crate::application::decision_engine::DecisionEngine;
use crate::application::market_research::{GatewayStats, MarketResearchUseCase, MarketSnapshot};
use crate::application::recommend::{RecommendUseCase, RecommendationReport};
use crate::config::AppConfig;
use crate::domain::entities::recommendation::TradingRecommendation;
use crate::domain::error::DomainError;
use crate::domain::ports::clock::Clock;
use crate::domain::ports::listing_source::ListingSource;
use crate::domain::values::market_filters::MarketFilters;
use crate::domain::values::market_statistics::MarketStatistics;
use crate::domain::values::performance::PlayerPerformanceSignal;
use crate::domain::values::thresholds::{ScoringWeights, TradingThresholds};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::feeds::ebay::EbayFeed;
use crate::infrastructure::resilience::circuit_breaker::CircuitBreaker;
use crate::infrastructure::resilience::listing_cache::ListingCache;
use std::sync::Arc;

pub struct CardTrader {
    research_uc: Arc<MarketResearchUseCase>,
    recommend_uc: RecommendUseCase,
}

impl CardTrader {
    /// Live wiring: eBay feed and the system clock.
    pub fn new(config: &AppConfig) -> Result<Self, DomainError> {
        let feed = EbayFeed::new(config.ebay_app_id.clone())
            .with_base_url(config.ebay_base_url.clone())
            .with_timeout(config.gateway_config().fetch_timeout);
        Self::with_providers(config, Arc::new(feed), Arc::new(SystemClock))
    }

    pub fn with_providers(
        config: &AppConfig,
        source: Arc<dyn ListingSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        let engine = DecisionEngine::new(config.thresholds.clone(), config.weights.clone())?;

        // One breaker per guarded dependency, owned here and shared by handle.
        let breaker = Arc::new(CircuitBreaker::new(source.name(), config.breaker_config(), clock.clone()));
        let cache = Arc::new(ListingCache::new(config.cache_ttl()));

        let research_uc = Arc::new(MarketResearchUseCase::new(
            source,
            clock,
            breaker,
            cache,
            config.retry_policy(),
            config.gateway_config(),
        ));

        Ok(Self {
            recommend_uc: RecommendUseCase::new(research_uc.clone(), engine),
            research_uc,
        })
    }

    pub async fn research(&self, query: &str, filters: &MarketFilters) -> Result<MarketSnapshot, DomainError> {
        self.research_uc.fetch_market_data(query, filters).await
    }

    pub async fn recommend(
        &self,
        query: &str,
        filters: &MarketFilters,
        performance: &PlayerPerformanceSignal,
    ) -> Result<RecommendationReport, DomainError> {
        self.recommend_uc.execute(query, filters, performance).await
    }

    /// Pure evaluation against already-known statistics.
    pub fn evaluate(&self, stats: &MarketStatistics, performance: &PlayerPerformanceSignal) -> TradingRecommendation {
        self.recommend_uc.engine().evaluate(stats, performance)
    }

    pub fn thresholds(&self) -> &TradingThresholds {
        self.recommend_uc.engine().thresholds()
    }

    pub fn weights(&self) -> &ScoringWeights {
        self.recommend_uc.engine().weights()
    }

    pub fn cache_stats(&self) -> GatewayStats {
        self.research_uc.stats()
    }

    pub fn clear_cache(&self) {
        self.research_uc.clear_cache()
    }

    pub fn reset_breaker(&self) {
        self.research_uc.reset_breaker()
    }
}

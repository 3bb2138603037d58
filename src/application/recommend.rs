//! Recommend use case — research the market for a card, then run the
//! decision engine on the result. Each request carries its own correlation id.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::application::decision_engine::DecisionEngine;
use crate::application::market_research::{MarketResearchUseCase, MarketSnapshot};
use crate::domain::entities::recommendation::TradingRecommendation;
use crate::domain::error::DomainError;
use crate::domain::values::market_filters::MarketFilters;
use crate::domain::values::performance::PlayerPerformanceSignal;

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationReport {
    pub request_id: Uuid,
    pub query: String,
    pub market: MarketSnapshot,
    pub recommendation: TradingRecommendation,
}

pub struct RecommendUseCase {
    research: Arc<MarketResearchUseCase>,
    engine: DecisionEngine,
}

impl RecommendUseCase {
    pub fn new(research: Arc<MarketResearchUseCase>, engine: DecisionEngine) -> Self {
        Self { research, engine }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub async fn execute(
        &self,
        query: &str,
        filters: &MarketFilters,
        performance: &PlayerPerformanceSignal,
    ) -> Result<RecommendationReport, DomainError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("recommend", %request_id, query);

        async move {
            let market = self.research.fetch_market_data(query, filters).await?;
            let recommendation = self.engine.evaluate(&market.statistics, performance);

            info!(
                signal = %recommendation.signal,
                score = recommendation.score,
                confidence = recommendation.confidence.value(),
                degraded = market.is_degraded(),
                insufficient = market.statistics.is_insufficient(),
                "Recommendation ready"
            );

            Ok(RecommendationReport {
                request_id,
                query: market.statistics.query.clone(),
                market,
                recommendation,
            })
        }
        .instrument(span)
        .await
    }
}

//! Trading decision engine: a deterministic map from market statistics and a
//! player-performance signal to a trading recommendation.
//!
//! Composite score:
//!
//! ```text
//! score = w_perf * performance
//!       + w_liq  * liquidity      (half depth, half sold ratio)
//!       + w_pt   * price_trend    (50 = flat, momentum scaled into 0..=100)
//!       ± trend_adjustment        (improving / declining player)
//!       - risk_penalty * |risks|
//! ```
//!
//! clamped to `[0, 100]`. Every term lands in the reasoning list in the order
//! it was applied. The engine holds no mutable state and never logs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::entities::recommendation::{
    FactorDirection, ReasoningFactor, RiskAssessment, RiskReward, TradingRecommendation,
};
use crate::domain::error::DomainError;
use crate::domain::values::confidence::Confidence;
use crate::domain::values::market_statistics::MarketStatistics;
use crate::domain::values::performance::{PerformanceTrend, PlayerPerformanceSignal};
use crate::domain::values::signal::Signal;
use crate::domain::values::thresholds::{ScoringWeights, TradingThresholds};

/// Component value that neither helps nor hurts.
const NEUTRAL: f64 = 50.0;

/// Momentum of ±20% saturates the price-trend component.
const MOMENTUM_SCALE: f64 = 250.0;

/// Reward/risk at or above which a buy is rated favorable.
const FAVORABLE_RATIO: Decimal = dec!(1.5);

pub const FACTOR_PERFORMANCE: &str = "performance";
pub const FACTOR_LIQUIDITY: &str = "liquidity";
pub const FACTOR_PRICE_TREND: &str = "price_trend";
pub const FACTOR_PLAYER_TREND: &str = "player_trend";
pub const FACTOR_INSUFFICIENT_DATA: &str = "insufficient_market_data";

#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    thresholds: TradingThresholds,
    weights: ScoringWeights,
}

impl DecisionEngine {
    /// Thresholds are already validated by construction; weights are checked here
    /// so a bad configuration fails before any evaluation.
    pub fn new(thresholds: TradingThresholds, weights: ScoringWeights) -> Result<Self, DomainError> {
        weights.validate()?;
        Ok(Self { thresholds, weights })
    }

    pub fn thresholds(&self) -> &TradingThresholds {
        &self.thresholds
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn evaluate(&self, stats: &MarketStatistics, perf: &PlayerPerformanceSignal) -> TradingRecommendation {
        let w = &self.weights;
        let insufficient = stats.is_insufficient();
        let mut reasoning = Vec::with_capacity(5 + perf.risks.len());

        let performance = perf.score.value();
        let (liquidity, price_trend) = if insufficient {
            (NEUTRAL, NEUTRAL)
        } else {
            (liquidity_component(stats, w.depth_saturation), price_trend_component(stats.price_momentum))
        };

        let mut raw = 0.0;
        for (name, component, weight) in [
            (FACTOR_PERFORMANCE, performance, w.performance),
            (FACTOR_LIQUIDITY, liquidity, w.liquidity),
            (FACTOR_PRICE_TREND, price_trend, w.price_trend),
        ] {
            let points = component * weight;
            raw += points;
            reasoning.push(ReasoningFactor::new(name, points, direction_of(component)));
        }

        let (adjustment, direction) = match perf.trend {
            PerformanceTrend::Improving => (w.trend_adjustment, FactorDirection::Positive),
            PerformanceTrend::Stable => (0.0, FactorDirection::Neutral),
            PerformanceTrend::Declining => (-w.trend_adjustment, FactorDirection::Negative),
        };
        raw += adjustment;
        reasoning.push(ReasoningFactor::new(FACTOR_PLAYER_TREND, adjustment, direction));

        for risk in &perf.risks {
            raw -= w.risk_penalty;
            reasoning.push(ReasoningFactor::new(
                format!("risk:{risk}"),
                w.risk_penalty,
                FactorDirection::Negative,
            ));
        }

        if insufficient {
            reasoning.push(ReasoningFactor::new(FACTOR_INSUFFICIENT_DATA, 0.0, FactorDirection::Neutral));
        }

        let score = raw.clamp(0.0, 100.0);
        let signal = classify(score, &self.thresholds);

        let mut confidence = self.confidence(score, stats.sample_count);
        if insufficient {
            confidence = confidence.capped_at(w.insufficient_confidence_ceiling);
        }

        let (entry_price, target_price, stop_loss_price) = reference_prices(stats.mean_price, &self.thresholds);
        let risk_reward = risk_reward(signal, entry_price, target_price, stop_loss_price);

        TradingRecommendation {
            signal,
            score,
            confidence,
            entry_price,
            target_price,
            stop_loss_price,
            risk_reward,
            data_quality: stats.data_quality,
            reasoning,
        }
    }

    /// `floor + (1 - floor) * sample_factor * margin_factor`, both factors
    /// saturating at 1. Monotonic in sample count and in distance from the
    /// nearest threshold.
    fn confidence(&self, score: f64, samples: usize) -> Confidence {
        let w = &self.weights;
        let margin = (score - self.thresholds.buy_threshold())
            .abs()
            .min((score - self.thresholds.hold_threshold()).abs());
        let sample_factor = (samples as f64 / w.full_confidence_samples as f64).min(1.0);
        let margin_factor = (margin / w.confidence_margin).min(1.0);
        Confidence::saturating(w.confidence_floor + (1.0 - w.confidence_floor) * sample_factor * margin_factor)
    }
}

/// Band lookup with inclusive lower bounds: a score exactly on a threshold
/// takes the higher signal.
pub fn classify(score: f64, thresholds: &TradingThresholds) -> Signal {
    if score >= thresholds.buy_threshold() {
        Signal::Buy
    } else if score >= thresholds.hold_threshold() {
        Signal::Hold
    } else {
        Signal::Sell
    }
}

/// Entry, target and stop. Target and stop derive from the entry price so
/// `entry * multiplier == target` holds exactly.
pub fn reference_prices(mean: Decimal, thresholds: &TradingThresholds) -> (Decimal, Decimal, Decimal) {
    let entry = mean * thresholds.entry_discount();
    (
        entry,
        entry * thresholds.target_multiplier(),
        entry * thresholds.stop_loss_discount(),
    )
}

/// Favorable only for a buy whose reward covers the risk at least
/// [`FAVORABLE_RATIO`] times; unfavorable for a sell or when the reward is
/// smaller than the risk (or unmeasurable).
pub fn risk_reward(signal: Signal, entry: Decimal, target: Decimal, stop: Decimal) -> RiskReward {
    let downside = entry - stop;
    let ratio = (downside > Decimal::ZERO)
        .then(|| (target - entry).checked_div(downside))
        .flatten()
        .map(|r| r.round_dp(2));

    let assessment = match (signal, ratio) {
        (Signal::Sell, _) | (_, None) => RiskAssessment::Unfavorable,
        (_, Some(r)) if r < Decimal::ONE => RiskAssessment::Unfavorable,
        (Signal::Buy, Some(r)) if r >= FAVORABLE_RATIO => RiskAssessment::Favorable,
        _ => RiskAssessment::Moderate,
    };
    RiskReward { ratio, assessment }
}

fn liquidity_component(stats: &MarketStatistics, depth_saturation: usize) -> f64 {
    let depth = (stats.sample_count as f64 / depth_saturation as f64).min(1.0) * 100.0;
    let sold = stats.liquidity.sold_ratio().unwrap_or(0.0) * 100.0;
    0.5 * depth + 0.5 * sold
}

fn price_trend_component(momentum: Option<f64>) -> f64 {
    match momentum {
        Some(m) if m.is_finite() => NEUTRAL + (m * MOMENTUM_SCALE).clamp(-NEUTRAL, NEUTRAL),
        _ => NEUTRAL,
    }
}

fn direction_of(component: f64) -> FactorDirection {
    if component > NEUTRAL {
        FactorDirection::Positive
    } else if component < NEUTRAL {
        FactorDirection::Negative
    } else {
        FactorDirection::Neutral
    }
}

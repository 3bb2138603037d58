use crate::domain::values::confidence::Confidence;
use crate::domain::values::market_statistics::DataQuality;
use crate::domain::values::signal::Signal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a factor pushed the composite score up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorDirection {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for FactorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorDirection::Positive => write!(f, "positive"),
            FactorDirection::Negative => write!(f, "negative"),
            FactorDirection::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskAssessment {
    Favorable,
    Moderate,
    Unfavorable,
}

impl fmt::Display for RiskAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskAssessment::Favorable => write!(f, "favorable"),
            RiskAssessment::Moderate => write!(f, "moderate"),
            RiskAssessment::Unfavorable => write!(f, "unfavorable"),
        }
    }
}

/// Upside to the target over downside to the stop, at the entry price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReward {
    /// Rounded to two places; `None` when there is no downside to measure.
    pub ratio: Option<Decimal>,
    pub assessment: RiskAssessment,
}

/// One auditable line of the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningFactor {
    pub name: String,
    /// Points this factor moved the score by (always non-negative).
    pub contribution: f64,
    pub direction: FactorDirection,
}

impl ReasoningFactor {
    pub fn new(name: impl Into<String>, contribution: f64, direction: FactorDirection) -> Self {
        Self {
            name: name.into(),
            contribution: contribution.abs(),
            direction,
        }
    }
}

/// Output of one decision-engine evaluation. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingRecommendation {
    pub signal: Signal,
    pub score: f64,
    pub confidence: Confidence,
    pub entry_price: Decimal,
    pub target_price: Decimal,
    pub stop_loss_price: Decimal,
    pub risk_reward: RiskReward,
    pub data_quality: DataQuality,
    pub reasoning: Vec<ReasoningFactor>,
}

impl TradingRecommendation {
    pub fn factor(&self, name: &str) -> Option<&ReasoningFactor> {
        self.reasoning.iter().find(|f| f.name == name)
    }
}

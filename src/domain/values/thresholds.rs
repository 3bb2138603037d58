//! Decision-engine configuration.
//!
//! Both structures are immutable once built and validated exactly once, at
//! construction (or deserialisation). An invalid configuration is a startup
//! failure, never an evaluation-time one.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Signal bands and price multipliers.
///
/// Defaults: buy 85, hold 70, entry ×0.95, target ×1.25 (of entry),
/// stop-loss ×0.85 (of entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct TradingThresholds {
    buy_threshold: f64,
    hold_threshold: f64,
    entry_discount: Decimal,
    target_multiplier: Decimal,
    stop_loss_discount: Decimal,
}

/// Raw, unvalidated shape accepted from JSON. Missing fields take defaults;
/// unknown fields are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThresholds {
    #[serde(default = "default_buy")]
    buy_threshold: f64,
    #[serde(default = "default_hold")]
    hold_threshold: f64,
    #[serde(default = "default_entry")]
    entry_discount: Decimal,
    #[serde(default = "default_target")]
    target_multiplier: Decimal,
    #[serde(default = "default_stop")]
    stop_loss_discount: Decimal,
}

fn default_buy() -> f64 {
    85.0
}
fn default_hold() -> f64 {
    70.0
}
fn default_entry() -> Decimal {
    dec!(0.95)
}
fn default_target() -> Decimal {
    dec!(1.25)
}
fn default_stop() -> Decimal {
    dec!(0.85)
}

impl TryFrom<RawThresholds> for TradingThresholds {
    type Error = DomainError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        TradingThresholds::new(
            raw.buy_threshold,
            raw.hold_threshold,
            raw.entry_discount,
            raw.target_multiplier,
            raw.stop_loss_discount,
        )
    }
}

impl TradingThresholds {
    pub fn new(
        buy_threshold: f64,
        hold_threshold: f64,
        entry_discount: Decimal,
        target_multiplier: Decimal,
        stop_loss_discount: Decimal,
    ) -> Result<Self, DomainError> {
        for (name, value) in [("buy_threshold", buy_threshold), ("hold_threshold", hold_threshold)] {
            if !value.is_finite() || value <= 0.0 || value > 100.0 {
                return Err(DomainError::InvalidConfiguration(format!(
                    "{name} must be in (0, 100], got {value}"
                )));
            }
        }
        if buy_threshold <= hold_threshold {
            return Err(DomainError::InvalidConfiguration(format!(
                "buy_threshold ({buy_threshold}) must exceed hold_threshold ({hold_threshold})"
            )));
        }
        for (name, value) in [
            ("entry_discount", entry_discount),
            ("target_multiplier", target_multiplier),
            ("stop_loss_discount", stop_loss_discount),
        ] {
            if value <= Decimal::ZERO {
                return Err(DomainError::InvalidConfiguration(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(Self {
            buy_threshold,
            hold_threshold,
            entry_discount,
            target_multiplier,
            stop_loss_discount,
        })
    }

    pub fn buy_threshold(&self) -> f64 {
        self.buy_threshold
    }

    pub fn hold_threshold(&self) -> f64 {
        self.hold_threshold
    }

    pub fn entry_discount(&self) -> Decimal {
        self.entry_discount
    }

    pub fn target_multiplier(&self) -> Decimal {
        self.target_multiplier
    }

    pub fn stop_loss_discount(&self) -> Decimal {
        self.stop_loss_discount
    }
}

impl Default for TradingThresholds {
    fn default() -> Self {
        Self {
            buy_threshold: default_buy(),
            hold_threshold: default_hold(),
            entry_discount: default_entry(),
            target_multiplier: default_target(),
            stop_loss_discount: default_stop(),
        }
    }
}

/// Composite-score weights and the knobs around them.
///
/// Missing fields take their defaults when deserialised. Deserialising does
/// not validate; [`ScoringWeights::validate`] runs when the engine is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringWeights {
    /// Weight of the player performance score.
    pub performance: f64,
    /// Weight of market liquidity (depth + sold/active ratio).
    pub liquidity: f64,
    /// Weight of price-trend favorability.
    pub price_trend: f64,
    /// Points added (improving) or removed (declining) for the player trend.
    pub trend_adjustment: f64,
    /// Points removed per active risk flag.
    pub risk_penalty: f64,
    /// Sample count at which liquidity depth saturates at 100.
    pub depth_saturation: usize,
    /// Sample count at which the sample factor of confidence reaches 1.0.
    pub full_confidence_samples: usize,
    /// Distance (points) from the nearest threshold that earns full margin credit.
    pub confidence_margin: f64,
    /// Confidence for a score sitting exactly on a threshold.
    pub confidence_floor: f64,
    /// Hard confidence cap when market data is insufficient.
    pub insufficient_confidence_ceiling: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            performance: 0.60,
            liquidity: 0.25,
            price_trend: 0.15,
            trend_adjustment: 5.0,
            risk_penalty: 15.0,
            depth_saturation: 20,
            full_confidence_samples: 30,
            confidence_margin: 10.0,
            confidence_floor: 0.10,
            insufficient_confidence_ceiling: 0.30,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<(), DomainError> {
        let weights = [self.performance, self.liquidity, self.price_trend];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DomainError::InvalidConfiguration(
                "scoring weights must be non-negative".into(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(DomainError::InvalidConfiguration(format!(
                "scoring weights must sum to 1.0, got {sum}"
            )));
        }
        let adjustments = [self.trend_adjustment, self.risk_penalty];
        if adjustments.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(DomainError::InvalidConfiguration(
                "trend adjustment and risk penalty must be non-negative".into(),
            ));
        }
        if self.depth_saturation == 0 || self.full_confidence_samples == 0 {
            return Err(DomainError::InvalidConfiguration(
                "sample saturation counts must be positive".into(),
            ));
        }
        if !self.confidence_margin.is_finite() || self.confidence_margin <= 0.0 {
            return Err(DomainError::InvalidConfiguration(
                "confidence_margin must be positive".into(),
            ));
        }
        let bounded = |v: f64| (0.0..=1.0).contains(&v);
        if !bounded(self.confidence_floor) || !bounded(self.insufficient_confidence_ceiling) {
            return Err(DomainError::InvalidConfiguration(
                "confidence floor and ceiling must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

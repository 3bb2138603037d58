//! Aggregate market statistics derived from one listings sample.
//!
//! Statistics are always derived fresh from the listings set and never mutated
//! in place. Derivation is deterministic for a given `(listings, as_of)` pair,
//! which is what lets a cache hit reproduce identical statistics.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::entities::market_listing::MarketListing;

/// Minimum sold listings before a recent-vs-older momentum is reported.
const MIN_MOMENTUM_SAMPLES: usize = 4;

/// Explicit data-sufficiency marker. `Insufficient` is a valid, low-confidence
/// result, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Sufficient,
    Insufficient,
}

impl DataQuality {
    pub fn is_insufficient(&self) -> bool {
        matches!(self, DataQuality::Insufficient)
    }
}

/// Sold vs. active counts inside the trailing liquidity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquidity {
    pub sold_count: usize,
    pub active_count: usize,
    pub window_days: u32,
}

impl Liquidity {
    /// Share of completed sales among windowed listings; `None` when the window is empty.
    pub fn sold_ratio(&self) -> Option<f64> {
        let total = self.sold_count + self.active_count;
        if total == 0 {
            None
        } else {
            Some(self.sold_count as f64 / total as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatistics {
    pub query: String,
    pub mean_price: Decimal,
    pub median_price: Decimal,
    pub std_dev: f64,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub sample_count: usize,
    pub liquidity: Liquidity,
    /// Relative change of the recent half of sold prices over the older half.
    pub price_momentum: Option<f64>,
    pub data_quality: DataQuality,
    pub as_of: DateTime<Utc>,
}

impl MarketStatistics {
    pub fn from_listings(
        query: &str,
        listings: &[MarketListing],
        as_of: DateTime<Utc>,
        min_samples: usize,
        window_days: u32,
    ) -> Self {
        let mut prices: Vec<Decimal> = listings.iter().map(|l| l.price).collect();
        prices.sort();

        let sample_count = prices.len();
        let data_quality = if sample_count == 0 || sample_count < min_samples {
            DataQuality::Insufficient
        } else {
            DataQuality::Sufficient
        };

        let window_start = as_of - Duration::days(i64::from(window_days));
        let (sold_count, active_count) = listings
            .iter()
            .filter(|l| l.observed_at >= window_start)
            .fold((0, 0), |(sold, active), l| {
                if l.is_sold() {
                    (sold + 1, active)
                } else {
                    (sold, active + 1)
                }
            });

        let liquidity = Liquidity {
            sold_count,
            active_count,
            window_days,
        };

        if sample_count == 0 {
            return Self {
                query: query.to_string(),
                mean_price: Decimal::ZERO,
                median_price: Decimal::ZERO,
                std_dev: 0.0,
                min_price: Decimal::ZERO,
                max_price: Decimal::ZERO,
                sample_count,
                liquidity,
                price_momentum: None,
                data_quality,
                as_of,
            };
        }

        let mean = mean_of(&prices);
        let median = if sample_count % 2 == 1 {
            prices[sample_count / 2]
        } else {
            ((prices[sample_count / 2 - 1] + prices[sample_count / 2]) / Decimal::TWO).round_dp(2)
        };

        let mean_f = mean.to_f64().unwrap_or(0.0);
        let variance = prices
            .iter()
            .filter_map(|p| p.to_f64())
            .map(|p| (p - mean_f).powi(2))
            .sum::<f64>()
            / sample_count as f64;

        Self {
            query: query.to_string(),
            mean_price: mean,
            median_price: median,
            std_dev: variance.sqrt(),
            min_price: prices[0],
            max_price: prices[sample_count - 1],
            sample_count,
            liquidity,
            price_momentum: momentum(listings),
            data_quality,
            as_of,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.data_quality.is_insufficient()
    }
}

fn mean_of(prices: &[Decimal]) -> Decimal {
    let sum: Decimal = prices.iter().copied().sum();
    (sum / Decimal::from(prices.len())).round_dp(2)
}

fn momentum(listings: &[MarketListing]) -> Option<f64> {
    let mut sold: Vec<&MarketListing> = listings.iter().filter(|l| l.is_sold()).collect();
    if sold.len() < MIN_MOMENTUM_SAMPLES {
        return None;
    }
    sold.sort_by_key(|l| l.observed_at);
    let (older, recent) = sold.split_at(sold.len() / 2);
    let older_mean = mean_of(&older.iter().map(|l| l.price).collect::<Vec<_>>());
    let recent_mean = mean_of(&recent.iter().map(|l| l.price).collect::<Vec<_>>());
    if older_mean.is_zero() {
        return None;
    }
    ((recent_mean - older_mean) / older_mean).to_f64()
}

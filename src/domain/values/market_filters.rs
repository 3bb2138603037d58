use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::values::card_condition::CardCondition;

/// Default result-count limit for one market query.
pub const DEFAULT_RESULT_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketFilters {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub condition: Option<CardCondition>,
    pub limit: u32,
    pub sold_only: bool,
}

impl Default for MarketFilters {
    fn default() -> Self {
        Self {
            min_price: None,
            max_price: None,
            condition: None,
            limit: DEFAULT_RESULT_LIMIT,
            sold_only: false,
        }
    }
}

impl MarketFilters {
    /// Reject caller-supplied filters before any network work happens.
    pub fn validate(&self, max_limit: u32) -> Result<(), DomainError> {
        for (name, bound) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if let Some(v) = bound {
                if v.is_sign_negative() && !v.is_zero() {
                    return Err(DomainError::InvalidInput(format!(
                        "{name} must be non-negative, got {v}"
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(DomainError::InvalidInput(format!(
                    "min_price ({min}) must not exceed max_price ({max})"
                )));
            }
        }
        if self.limit == 0 || self.limit > max_limit {
            return Err(DomainError::InvalidInput(format!(
                "limit must be between 1 and {max_limit}, got {}",
                self.limit
            )));
        }
        Ok(())
    }

    /// Canonical text form used inside cache keys.
    pub fn canonical(&self) -> String {
        let fmt_price = |p: Option<Decimal>| p.map(|d| d.normalize().to_string()).unwrap_or_default();
        format!(
            "min={}|max={}|cond={}|limit={}|sold={}",
            fmt_price(self.min_price),
            fmt_price(self.max_price),
            self.condition.map(|c| c.to_string()).unwrap_or_default(),
            self.limit,
            self.sold_only,
        )
    }
}

use crate::domain::values::card_condition::CardCondition;
use crate::domain::values::listing_status::ListingStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One observed sale or active listing. Prices are in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketListing {
    pub id: String,
    pub title: String,
    pub price: Decimal,
    pub condition: CardCondition,
    pub status: ListingStatus,
    pub observed_at: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl MarketListing {
    pub fn new(
        id: String,
        title: String,
        price: Decimal,
        condition: CardCondition,
        status: ListingStatus,
        observed_at: DateTime<Utc>,
        source: String,
    ) -> Self {
        Self {
            id,
            title,
            price,
            condition,
            status,
            observed_at,
            source,
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn is_sold(&self) -> bool {
        self.status == ListingStatus::Sold
    }
}

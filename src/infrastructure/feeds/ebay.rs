use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::domain::entities::market_listing::MarketListing;
use crate::domain::ports::listing_source::{ListingSource, SourceError};
use crate::domain::values::card_condition::CardCondition;
use crate::domain::values::listing_status::ListingStatus;
use crate::domain::values::market_filters::MarketFilters;

pub const FINDING_API_URL: &str = "https://svcs.ebay.com/services/search/FindingService/v1";

/// eBay category id for sports trading cards.
pub const SPORTS_CARDS_CATEGORY: &str = "261328";

/// Message eBay returns when the app id exhausted its call quota.
const QUOTA_MESSAGE: &str = "exceeded the number of times";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// eBay Finding API feed.
///
/// Sold-only queries read completed sales. Otherwise the result limit is
/// split between completed sales and live listings so the sold/active mix
/// reflects the market rather than the operation that was called.
pub struct EbayFeed {
    app_id: String,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("cardtrader/0.1")
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

impl EbayFeed {
    pub fn new(app_id: String) -> Self {
        Self {
            app_id,
            base_url: FINDING_API_URL.into(),
            timeout: DEFAULT_TIMEOUT,
            client: build_client(DEFAULT_TIMEOUT),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-request HTTP timeout, normally the configured fetch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = build_client(timeout);
        self
    }

    fn operation(sold: bool) -> &'static str {
        if sold {
            "findCompletedItems"
        } else {
            "findItemsAdvanced"
        }
    }

    /// `(sold, entries)` for each call one fetch makes.
    fn plan(filters: &MarketFilters) -> Vec<(bool, u32)> {
        if filters.sold_only {
            return vec![(true, filters.limit)];
        }
        let active = filters.limit / 2;
        [(true, filters.limit - active), (false, active)]
            .into_iter()
            .filter(|(_, entries)| *entries > 0)
            .collect()
    }

    fn build_params(&self, query: &str, filters: &MarketFilters, sold: bool, entries: u32) -> Vec<(String, String)> {
        let mut params = vec![
            ("OPERATION-NAME".to_string(), Self::operation(sold).to_string()),
            ("SERVICE-VERSION".to_string(), "1.0.0".to_string()),
            ("SECURITY-APPNAME".to_string(), self.app_id.clone()),
            ("RESPONSE-DATA-FORMAT".to_string(), "JSON".to_string()),
            ("GLOBAL-ID".to_string(), "EBAY-US".to_string()),
            ("keywords".to_string(), query.to_string()),
            ("paginationInput.entriesPerPage".to_string(), entries.to_string()),
            ("sortOrder".to_string(), "EndTimeSoonest".to_string()),
            ("categoryId".to_string(), SPORTS_CARDS_CATEGORY.to_string()),
        ];

        let mut filter_index = 0;
        for (name, bound) in [("MinPrice", filters.min_price), ("MaxPrice", filters.max_price)] {
            if let Some(value) = bound {
                params.push((format!("itemFilter({filter_index}).name"), name.to_string()));
                params.push((format!("itemFilter({filter_index}).value"), value.to_string()));
                filter_index += 1;
            }
        }
        if sold {
            params.push((format!("itemFilter({filter_index}).name"), "SoldItemsOnly".to_string()));
            params.push((format!("itemFilter({filter_index}).value"), "true".to_string()));
        }

        params
    }

    fn timeout_error(&self) -> SourceError {
        SourceError::Timeout(self.timeout)
    }

    async fn call(&self, query: &str, filters: &MarketFilters, sold: bool, entries: u32) -> Result<Vec<MarketListing>, SourceError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&self.build_params(query, filters, sold, entries))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.timeout_error()
                } else {
                    SourceError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        parse_response(&data, sold, Utc::now())
    }
}

#[async_trait]
impl ListingSource for EbayFeed {
    fn name(&self) -> &str {
        "ebay"
    }

    async fn fetch(&self, query: &str, filters: &MarketFilters) -> Result<Vec<MarketListing>, SourceError> {
        if self.app_id.is_empty() {
            return Err(SourceError::Config(
                "EBAY_APP_ID is not set; register at https://developer.ebay.com/".into(),
            ));
        }

        let mut listings = Vec::new();
        for (sold, entries) in Self::plan(filters) {
            listings.extend(self.call(query, filters, sold, entries).await?);
        }
        if let Some(wanted) = filters.condition {
            listings.retain(|l| l.condition == wanted);
        }
        Ok(listings)
    }
}

fn classify_status(status: u16, body: &str) -> SourceError {
    if status == 429 || body.contains(QUOTA_MESSAGE) {
        return SourceError::RateLimited(format!("eBay returned {status}"));
    }
    if status >= 500 {
        SourceError::Network(format!("eBay returned {status}"))
    } else {
        SourceError::Config(format!("eBay rejected the request ({status})"))
    }
}

/// First element of one of eBay's array-wrapped fields.
fn first<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key)?.as_array()?.first()
}

fn first_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    first(value, key)?.as_str()
}

/// Parse a Finding API JSON body. Each item's status comes from its
/// `sellingState`, falling back to what the operation implies. Items missing
/// an id, title or price are skipped rather than failing the whole page.
pub fn parse_response(data: &Value, sold: bool, observed_fallback: DateTime<Utc>) -> Result<Vec<MarketListing>, SourceError> {
    let root_key = format!("{}Response", EbayFeed::operation(sold));
    let root = first(data, &root_key)
        .ok_or_else(|| SourceError::Parse(format!("missing {root_key}")))?;

    if first_str(root, "ack") == Some("Failure") {
        let message = first(root, "errorMessage")
            .and_then(|m| first(m, "error"))
            .and_then(|e| first_str(e, "message"))
            .unwrap_or("unknown error");
        if message.contains(QUOTA_MESSAGE) {
            return Err(SourceError::RateLimited(message.to_string()));
        }
        return Err(SourceError::Config(format!("eBay call failed: {message}")));
    }

    let items = match first(root, "searchResult").and_then(|r| r.get("item")).and_then(|i| i.as_array()) {
        Some(items) => items,
        None => return Ok(vec![]),
    };

    let default_status = if sold {
        ListingStatus::Sold
    } else {
        ListingStatus::Active
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            let status = match first(item, "sellingStatus").and_then(|s| first_str(s, "sellingState")) {
                Some("EndedWithSales") => ListingStatus::Sold,
                Some("Active") => ListingStatus::Active,
                // Ended unsold or cancelled: neither a sale nor live supply.
                Some(_) => return None,
                None => default_status,
            };
            let id = first_str(item, "itemId")?;
            let title = first_str(item, "title")?;
            let price_value = first(item, "sellingStatus")
                .and_then(|s| first(s, "currentPrice"))
                .and_then(|p| p.get("__value__"))?;
            let price = match price_value {
                Value::String(s) => Decimal::from_str(s).ok()?,
                Value::Number(n) => Decimal::from_str(&n.to_string()).ok()?,
                _ => return None,
            };
            let condition_label = first(item, "condition")
                .and_then(|c| first_str(c, "conditionDisplayName"))
                .unwrap_or("");
            let observed_at = first(item, "listingInfo")
                .and_then(|l| first_str(l, "endTime"))
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or(observed_fallback);

            let mut listing = MarketListing::new(
                id.to_string(),
                title.to_string(),
                price,
                CardCondition::from_listing(condition_label, title),
                status,
                observed_at,
                "ebay".to_string(),
            );
            if let Some(url) = first_str(item, "viewItemURL") {
                listing = listing.with_url(url);
            }
            Some(listing)
        })
        .collect())
}

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::entities::market_listing::MarketListing;
use crate::domain::ports::listing_source::{ListingSource, SourceError};
use crate::domain::values::market_filters::MarketFilters;

/// Listings fixture read from a JSON array on disk. Applies the same filters
/// the live feed would, which makes offline runs and demos reproducible.
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ListingSource for FileFeed {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self, query: &str, filters: &MarketFilters) -> Result<Vec<MarketListing>, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Config(format!("{}: {e}", self.path.display())))?;
        let listings: Vec<MarketListing> =
            serde_json::from_str(&raw).map_err(|e| SourceError::Parse(e.to_string()))?;

        let terms: Vec<String> = query.split_whitespace().map(|t| t.to_lowercase()).collect();

        Ok(listings
            .into_iter()
            .filter(|l| {
                let title = l.title.to_lowercase();
                terms.iter().all(|t| title.contains(t.as_str()))
            })
            .filter(|l| !filters.sold_only || l.is_sold())
            .filter(|l| filters.min_price.map_or(true, |min| l.price >= min))
            .filter(|l| filters.max_price.map_or(true, |max| l.price <= max))
            .filter(|l| filters.condition.map_or(true, |c| l.condition == c))
            .take(filters.limit as usize)
            .collect())
    }
}

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::market_listing::MarketListing;
use crate::domain::values::market_filters::MarketFilters;

/// External raw-listing fetch. Implementations do the network call only;
/// caching, retries and the circuit breaker are layered on by the gateway.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Name of the guarded dependency (e.g., "ebay").
    fn name(&self) -> &str;

    /// Fetch listings for an already-validated query and filter set.
    async fn fetch(&self, query: &str, filters: &MarketFilters) -> Result<Vec<MarketListing>, SourceError>;
}

#[derive(Debug, Clone)]
pub enum SourceError {
    /// HTTP or network error
    Network(String),
    /// Attempt exceeded the per-call timeout
    Timeout(Duration),
    /// Upstream quota or rate limit signalled
    RateLimited(String),
    /// Response parsing error
    Parse(String),
    /// Configuration error (missing app id, etc.)
    Config(String),
}

impl SourceError {
    /// Worth retrying with backoff before counting against the breaker.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Network(_) | SourceError::Timeout(_) | SourceError::RateLimited(_)
        )
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Network(msg) => write!(f, "Network error: {msg}"),
            SourceError::Timeout(d) => write!(f, "Timed out after {}ms", d.as_millis()),
            SourceError::RateLimited(msg) => write!(f, "Rate limited: {msg}"),
            SourceError::Parse(msg) => write!(f, "Parse error: {msg}"),
            SourceError::Config(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

pub mod circuit_breaker;
pub mod listing_cache;
pub mod retry;

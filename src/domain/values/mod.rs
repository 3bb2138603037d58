pub mod card_condition;
pub mod card_query;
pub mod confidence;
pub mod listing_status;
pub mod market_filters;
pub mod market_statistics;
pub mod performance;
pub mod signal;
pub mod thresholds;

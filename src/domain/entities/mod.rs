pub mod market_listing;
pub mod recommendation;

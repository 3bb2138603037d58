pub mod clock;
pub mod listing_source;

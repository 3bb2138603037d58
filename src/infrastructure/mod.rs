pub mod clock;
pub mod feeds;
pub mod resilience;

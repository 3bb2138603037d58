pub mod decision_engine;
pub mod market_research;
pub mod recommend;

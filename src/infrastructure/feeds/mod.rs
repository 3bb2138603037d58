pub mod ebay;
pub mod file;

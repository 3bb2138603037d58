use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Sold,
    Active,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingStatus::Sold => write!(f, "sold"),
            ListingStatus::Active => write!(f, "active"),
        }
    }
}

impl FromStr for ListingStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sold" => Ok(ListingStatus::Sold),
            "active" => Ok(ListingStatus::Active),
            _ => Err(format!("Unknown listing status: {s}")),
        }
    }
}

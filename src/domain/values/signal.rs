use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trading signal. Ordered `Sell < Hold < Buy` so monotonicity can be asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Sell,
    Hold,
    Buy,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
            Signal::Buy => write!(f, "BUY"),
        }
    }
}

impl FromStr for Signal {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sell" => Ok(Signal::Sell),
            "hold" => Ok(Signal::Hold),
            "buy" => Ok(Signal::Buy),
            _ => Err(format!("Unknown signal: {s}")),
        }
    }
}

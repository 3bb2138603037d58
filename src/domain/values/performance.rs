//! Player-performance input supplied by the player-analysis collaborator.
//!
//! The score itself is computed elsewhere; this module only validates it at
//! the boundary so the decision engine never sees an out-of-range value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::DomainError;

/// Performance score on a 0–100 scale. Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct PerformanceScore(f64);

impl PerformanceScore {
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(DomainError::InvalidInput(format!(
                "Performance score must be between 0 and 100, got {value}"
            )));
        }
        Ok(PerformanceScore(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for PerformanceScore {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        PerformanceScore::new(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl fmt::Display for PerformanceTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceTrend::Improving => write!(f, "improving"),
            PerformanceTrend::Stable => write!(f, "stable"),
            PerformanceTrend::Declining => write!(f, "declining"),
        }
    }
}

impl FromStr for PerformanceTrend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "improving" | "up" => Ok(PerformanceTrend::Improving),
            "stable" | "flat" => Ok(PerformanceTrend::Stable),
            "declining" | "down" => Ok(PerformanceTrend::Declining),
            _ => Err(format!("Unknown performance trend: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    InjuryConcern,
    AgeConcern,
    SuspensionConcern,
    PerformanceVolatility,
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskFlag::InjuryConcern => write!(f, "injury_concern"),
            RiskFlag::AgeConcern => write!(f, "age_concern"),
            RiskFlag::SuspensionConcern => write!(f, "suspension_concern"),
            RiskFlag::PerformanceVolatility => write!(f, "performance_volatility"),
        }
    }
}

impl FromStr for RiskFlag {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "injury_concern" | "injury" => Ok(RiskFlag::InjuryConcern),
            "age_concern" | "age" => Ok(RiskFlag::AgeConcern),
            "suspension_concern" | "suspension" => Ok(RiskFlag::SuspensionConcern),
            "performance_volatility" | "volatility" => Ok(RiskFlag::PerformanceVolatility),
            _ => Err(format!("Unknown risk flag: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPerformanceSignal {
    pub score: PerformanceScore,
    #[serde(default)]
    pub trend: PerformanceTrend,
    /// Ordered set so penalties are applied deterministically.
    #[serde(default)]
    pub risks: BTreeSet<RiskFlag>,
}

impl PlayerPerformanceSignal {
    pub fn new(
        score: f64,
        trend: PerformanceTrend,
        risks: impl IntoIterator<Item = RiskFlag>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            score: PerformanceScore::new(score)?,
            trend,
            risks: risks.into_iter().collect(),
        })
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Structured card description turned into marketplace search keywords.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardQuery {
    pub player: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub rookie: bool,
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub graded: bool,
    #[serde(default)]
    pub psa_grade: Option<u8>,
}

impl CardQuery {
    pub fn new(player: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            ..Default::default()
        }
    }

    /// Keyword string in marketplace order: player, year, manufacturer, then
    /// rookie/auto markers and the grading token. A PSA grade implies graded.
    pub fn keywords(&self) -> Result<String, DomainError> {
        let player = self.player.trim();
        if player.is_empty() {
            return Err(DomainError::InvalidInput("player name must not be empty".into()));
        }

        let mut parts = vec![player.to_string()];
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        if let Some(m) = self.manufacturer.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            parts.push(m.to_string());
        }
        if self.rookie {
            parts.push("rookie".into());
        }
        if self.auto {
            parts.push("auto".into());
        }
        match self.psa_grade {
            Some(grade) if (1..=10).contains(&grade) => {
                parts.push("PSA".into());
                parts.push(grade.to_string());
            }
            Some(grade) => {
                return Err(DomainError::InvalidInput(format!(
                    "PSA grade must be between 1 and 10, got {grade}"
                )))
            }
            None if self.graded => parts.push("graded".into()),
            None => {}
        }
        Ok(parts.join(" "))
    }
}

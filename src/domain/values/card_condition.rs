use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grading companies whose slab labels we recognise in listing titles.
const GRADERS: [&str; 4] = ["PSA", "BGS", "SGC", "CGC"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardCondition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
    /// Encapsulated slab with a whole-number grade (1–10).
    Graded { grade: u8 },
    /// Marketplace did not report anything we could map.
    Unspecified,
}

impl CardCondition {
    /// Best-effort mapping of a marketplace condition label plus listing title.
    /// A grading token in the title ("PSA 10", "BGS 9.5") wins over the label.
    pub fn from_listing(label: &str, title: &str) -> Self {
        if let Some(grade) = grade_from_title(title) {
            return CardCondition::Graded { grade };
        }
        label.parse().unwrap_or(CardCondition::Unspecified)
    }

    pub fn is_graded(&self) -> bool {
        matches!(self, CardCondition::Graded { .. })
    }
}

fn grade_from_title(title: &str) -> Option<u8> {
    let tokens: Vec<&str> = title.split_whitespace().collect();
    tokens.windows(2).find_map(|pair| {
        let company = pair[0].trim_matches(|c: char| !c.is_ascii_alphanumeric());
        if !GRADERS.iter().any(|g| g.eq_ignore_ascii_case(company)) {
            return None;
        }
        let grade: f64 = pair[1]
            .trim_matches(|c: char| !(c.is_ascii_digit() || c == '.'))
            .parse()
            .ok()?;
        if (1.0..=10.0).contains(&grade) {
            Some(grade.floor() as u8)
        } else {
            None
        }
    })
}

impl fmt::Display for CardCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardCondition::New => write!(f, "new"),
            CardCondition::LikeNew => write!(f, "like_new"),
            CardCondition::Good => write!(f, "good"),
            CardCondition::Fair => write!(f, "fair"),
            CardCondition::Poor => write!(f, "poor"),
            CardCondition::Graded { grade } => write!(f, "graded_{grade}"),
            CardCondition::Unspecified => write!(f, "unspecified"),
        }
    }
}

impl FromStr for CardCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        if let Some(grade) = normalized.strip_prefix("graded_") {
            return match grade.parse::<u8>() {
                Ok(g) if (1..=10).contains(&g) => Ok(CardCondition::Graded { grade: g }),
                _ => Err(format!("Invalid grade in condition: {s}")),
            };
        }
        match normalized.as_str() {
            "new" | "brand_new" => Ok(CardCondition::New),
            "like_new" | "mint" | "near_mint" => Ok(CardCondition::LikeNew),
            "good" | "very_good" | "excellent" | "ungraded" | "used" | "pre_owned" => {
                Ok(CardCondition::Good)
            }
            "fair" => Ok(CardCondition::Fair),
            "poor" => Ok(CardCondition::Poor),
            _ => Err(format!("Unknown card condition: {s}")),
        }
    }
}

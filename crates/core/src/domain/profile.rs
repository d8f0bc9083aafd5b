use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Engineering,
    Design,
    Product,
    Business,
    AiMl,
    Crypto,
    Other,
}

impl Role {
    pub const KNOWN: [Role; 6] =
        [Self::Engineering, Self::Design, Self::Product, Self::Business, Self::AiMl, Self::Crypto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Engineering => "engineering",
            Self::Design => "design",
            Self::Product => "product",
            Self::Business => "business",
            Self::AiMl => "ai_ml",
            Self::Crypto => "crypto",
            Self::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Engineering => "Engineering",
            Self::Design => "Design",
            Self::Product => "Product",
            Self::Business => "Business",
            Self::AiMl => "AI/ML",
            Self::Crypto => "Crypto",
            Self::Other => "Generalist",
        }
    }

    /// Maps free-form model output onto the fixed enumeration. Unknown values
    /// land on `Other` instead of failing.
    pub fn parse_lenient(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|ch| if matches!(ch, '-' | '/' | ' ') { '_' } else { ch })
            .collect();

        match normalized.as_str() {
            "engineering" => Self::Engineering,
            "design" => Self::Design,
            "product" => Self::Product,
            "business" => Self::Business,
            "ai_ml" | "aiml" => Self::AiMl,
            "crypto" => Self::Crypto,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Junior,
    Mid,
    Senior,
    Unspecified,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Junior => "junior",
            Self::Mid => "mid",
            Self::Senior => "senior",
            Self::Unspecified => "unspecified",
        }
    }

    pub fn parse_lenient(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "junior" | "entry" | "entry-level" => Self::Junior,
            "mid" | "mid-level" | "intermediate" => Self::Mid,
            "senior" | "lead" | "staff" | "principal" => Self::Senior,
            _ => Self::Unspecified,
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub role: Role,
    pub interests: Vec<String>,
    pub experience: ExperienceLevel,
    pub industry: Option<String>,
    pub summary: Option<String>,
    pub source_description: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn interests_label(&self) -> String {
        if self.interests.is_empty() {
            "none captured".to_owned()
        } else {
            self.interests.join(", ")
        }
    }
}

/// Why a model response could not be turned into a profile.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("description was empty")]
    EmptyDescription,
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("no structured profile could be recovered from the model response")]
    NoStructuredContent,
    #[error("model response did not include a role")]
    MissingRole,
}

/// Trims, drops blanks, and removes case-insensitive duplicates while keeping
/// first-seen order.
pub fn normalize_interests<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .map(|item| {
            item.as_ref().trim().trim_matches(|ch| ch == '"' || ch == '\'').trim().to_owned()
        })
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

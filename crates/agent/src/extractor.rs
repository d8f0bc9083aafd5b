//! Turns a free-text self-description into a `UserProfile` with one model call.
//!
//! Model output is treated as untrusted text. The parser looks for the
//! outermost JSON object first and falls back to `key: value` lines, so prose
//! around the payload or code fences do not break extraction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pulse_core::domain::profile::{
    normalize_interests, ExperienceLevel, ExtractionFailure, Role, UserId, UserProfile,
};
use pulse_core::errors::{ApplicationError, DomainError};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::llm::{CompletionRequest, LlmClient};

pub const PROFILE_SYSTEM_PROMPT: &str = "You are an expert at analyzing user descriptions to create personalized news profiles. Always return valid JSON.";

const PROFILE_TEMPERATURE: f32 = 0.3;
const PROFILE_MAX_TOKENS: u32 = 800;

pub fn profile_prompt(description: &str) -> String {
    format!(
        r#"Analyze this user's description and create a structured profile for personalized news curation.

User description: "{description}"

Return a single JSON object with these keys:
{{
  "role": "one of engineering | design | product | business | ai_ml | crypto | other",
  "interests": ["specific", "topics", "they", "follow"],
  "experience_level": "junior | mid | senior",
  "industry": "industry they work in",
  "summary": "one sentence summary of their profile"
}}

Infer details from context. Use "other" when no role fits."#
    )
}

pub struct ProfileExtractor {
    llm: Arc<dyn LlmClient>,
}

impl ProfileExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn extract(
        &self,
        user_id: &UserId,
        description: &str,
    ) -> Result<UserProfile, ApplicationError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(DomainError::from(ExtractionFailure::EmptyDescription).into());
        }

        let request = CompletionRequest {
            system: Some(PROFILE_SYSTEM_PROMPT.to_owned()),
            prompt: profile_prompt(description),
            temperature: PROFILE_TEMPERATURE,
            max_tokens: PROFILE_MAX_TOKENS,
        };
        let response = self.llm.complete(&request).await?;

        match parse_profile_response(user_id, description, &response, Utc::now()) {
            Ok(profile) => {
                info!(
                    event_name = "profile.extracted",
                    user_id = %user_id,
                    role = profile.role.as_str(),
                    interests = profile.interests.len(),
                    "profile extracted"
                );
                Ok(profile)
            }
            Err(failure) => {
                warn!(
                    event_name = "profile.extraction_failed",
                    user_id = %user_id,
                    reason = %failure,
                    "profile extraction failed"
                );
                Err(DomainError::from(failure).into())
            }
        }
    }
}

#[derive(Debug, Default)]
struct RawProfile {
    role: Option<String>,
    interests: Vec<String>,
    technologies: Vec<String>,
    experience: Option<String>,
    industry: Option<String>,
    summary: Option<String>,
    recognized_keys: usize,
}

pub fn parse_profile_response(
    user_id: &UserId,
    description: &str,
    response: &str,
    created_at: DateTime<Utc>,
) -> Result<UserProfile, ExtractionFailure> {
    let response = response.trim();
    if response.is_empty() {
        return Err(ExtractionFailure::EmptyResponse);
    }

    let raw = match json_object_span(response) {
        Some(object) => from_json(&object),
        None => from_key_values(response),
    };

    if raw.recognized_keys == 0 {
        return Err(ExtractionFailure::NoStructuredContent);
    }

    let role = raw
        .role
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(Role::parse_lenient)
        .ok_or(ExtractionFailure::MissingRole)?;

    let experience = match raw.experience.as_deref() {
        Some(value) => ExperienceLevel::parse_lenient(value),
        None => ExperienceLevel::Unspecified,
    };

    Ok(UserProfile {
        user_id: user_id.clone(),
        role,
        interests: normalize_interests(raw.interests.iter().chain(raw.technologies.iter())),
        experience,
        industry: non_blank(raw.industry),
        summary: non_blank(raw.summary),
        source_description: description.to_owned(),
        created_at,
    })
}

fn json_object_span(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn from_json(object: &Map<String, Value>) -> RawProfile {
    let mut raw = RawProfile::default();

    for (key, value) in object {
        match canonical_key(key) {
            Some(Field::Role) => raw.role = value.as_str().map(str::to_owned),
            Some(Field::Interests) => raw.interests.extend(json_list(value)),
            Some(Field::Technologies) => raw.technologies.extend(json_list(value)),
            Some(Field::Experience) => raw.experience = value.as_str().map(str::to_owned),
            Some(Field::Industry) => raw.industry = value.as_str().map(str::to_owned),
            Some(Field::Summary) => raw.summary = value.as_str().map(str::to_owned),
            None => continue,
        }
        raw.recognized_keys += 1;
    }

    raw
}

fn from_key_values(text: &str) -> RawProfile {
    let mut raw = RawProfile::default();

    for line in text.lines() {
        let line = line.trim().trim_start_matches(['-', '*', '•']).trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_matches(['*', '_', '"', '\'']).trim();
        let value = value.trim().trim_matches(['*', '_']).trim();

        match canonical_key(key) {
            Some(Field::Role) => raw.role = Some(unquote(value)),
            Some(Field::Interests) => raw.interests.extend(split_list(value)),
            Some(Field::Technologies) => raw.technologies.extend(split_list(value)),
            Some(Field::Experience) => raw.experience = Some(unquote(value)),
            Some(Field::Industry) => raw.industry = Some(unquote(value)),
            Some(Field::Summary) => raw.summary = Some(unquote(value)),
            None => continue,
        }
        raw.recognized_keys += 1;
    }

    raw
}

enum Field {
    Role,
    Interests,
    Technologies,
    Experience,
    Industry,
    Summary,
}

fn canonical_key(key: &str) -> Option<Field> {
    let normalized = key.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    match normalized.as_str() {
        "role" | "primary_role" => Some(Field::Role),
        "interests" | "secondary_interests" | "topics" => Some(Field::Interests),
        "specific_technologies" | "technologies" => Some(Field::Technologies),
        "experience" | "experience_level" => Some(Field::Experience),
        "industry" => Some(Field::Industry),
        "summary" => Some(Field::Summary),
        _ => None,
    }
}

fn json_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => {
            items.iter().filter_map(Value::as_str).map(str::to_owned).collect()
        }
        Value::String(text) => split_list(text),
        _ => Vec::new(),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(unquote)
        .collect()
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches(['"', '\'']).trim().to_owned()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_owned()).filter(|text| !text.is_empty())
}

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use pulse_core::curator::{RationaleError, RationaleWriter};
use pulse_core::domain::article::ArticleEntry;
use pulse_core::domain::digest::RationaleSource;
use pulse_core::domain::profile::UserProfile;

use crate::llm::{CompletionRequest, LlmClient};

const RATIONALE_SYSTEM_PROMPT: &str = "You are a personalized news curator who understands each user's unique professional needs and interests.";

/// Asks the model for one short line per article explaining why it matters to
/// this reader.
pub struct LlmRationaleWriter {
    llm: Arc<dyn LlmClient>,
}

impl LlmRationaleWriter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RationaleWriter for LlmRationaleWriter {
    fn source(&self) -> RationaleSource {
        RationaleSource::Generated
    }

    async fn write(
        &self,
        profile: &UserProfile,
        articles: &[ArticleEntry],
    ) -> Result<Vec<String>, RationaleError> {
        if articles.is_empty() {
            return Ok(Vec::new());
        }

        let request = CompletionRequest {
            system: Some(RATIONALE_SYSTEM_PROMPT.to_owned()),
            prompt: rationale_prompt(profile, articles),
            temperature: 0.7,
            max_tokens: 600,
        };
        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|error| RationaleError::Unavailable(error.to_string()))?;

        let lines = parse_numbered_lines(&response);
        if lines.len() != articles.len() {
            return Err(RationaleError::CountMismatch {
                expected: articles.len(),
                actual: lines.len(),
            });
        }
        Ok(lines)
    }
}

pub fn rationale_prompt(profile: &UserProfile, articles: &[ArticleEntry]) -> String {
    let mut prompt = format!(
        "Reader: {} ({} level). Interests: {}.\n",
        profile.role.label(),
        profile.experience,
        profile.interests_label()
    );
    if let Some(summary) = &profile.summary {
        let _ = writeln!(prompt, "Profile: {summary}");
    }
    prompt.push_str("\nArticles:\n");
    for (idx, article) in articles.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {} ({}): {}", idx + 1, article.title, article.source, article.summary);
    }
    let _ = write!(
        prompt,
        "\nFor each article, write exactly one sentence on why it matters to this reader. \
         Reply with exactly {} numbered lines and nothing else.",
        articles.len()
    );
    prompt
}

/// Keeps non-empty lines and strips `1.`, `2)`, `3:` or `-` list markers.
pub fn parse_numbered_lines(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| strip_list_marker(line).trim().to_owned())
        .filter(|line| !line.is_empty())
        .collect()
}

// Leading digits only count as a marker when a separator follows them.
fn strip_list_marker(line: &str) -> &str {
    let rest = line.trim_start_matches(|ch: char| ch.is_ascii_digit());
    if rest.len() < line.len() {
        return rest.strip_prefix(['.', ')', ':']).unwrap_or(line);
    }
    line.trim_start_matches(['-', '*', '•'])
}

use std::sync::Arc;

use chrono::Utc;
use pulse_core::config::DEFAULT_MAX_ARTICLES;
use pulse_core::{
    normalize_interests, DigestCurator, DigestResult, ExperienceLevel, Role, StaticCatalog,
    UserId, UserProfile,
};

use super::CommandResult;

const PREVIEW_USER: &str = "preview";

pub fn run(role: &str, interests: &[String], max: Option<usize>) -> CommandResult {
    let max_articles = max.unwrap_or(DEFAULT_MAX_ARTICLES);
    if max_articles == 0 {
        return CommandResult::failure(
            "preview",
            "invalid_argument",
            "--max must be at least 1",
            2,
        );
    }

    let profile = preview_profile(role, interests);
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "preview",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    let curator = DigestCurator::new(Arc::new(StaticCatalog::builtin()), max_articles);
    match runtime.block_on(curator.curate(&profile)) {
        Ok(digest) => CommandResult::text(0, render(&profile, &digest)),
        Err(error) => CommandResult::failure("preview", "curation", error.to_string(), 1),
    }
}

fn preview_profile(role: &str, interests: &[String]) -> UserProfile {
    let role = Role::parse_lenient(role);
    let interests = normalize_interests(interests);

    UserProfile {
        user_id: UserId::new(PREVIEW_USER),
        role,
        interests,
        experience: ExperienceLevel::Unspecified,
        industry: None,
        summary: None,
        source_description: format!("preview profile for {}", role.label()),
        created_at: Utc::now(),
    }
}

fn render(profile: &UserProfile, digest: &DigestResult) -> String {
    let mut lines = vec![format!(
        "digest preview for {} (interests: {}) - {} article(s)",
        profile.role.label(),
        profile.interests_label(),
        digest.len()
    )];

    if digest.used_general_fallback {
        lines.push("note: no articles tagged for this role; showing general picks".to_string());
    }

    for (index, item) in digest.items.iter().enumerate() {
        lines.push(format!("{}. {} ({})", index + 1, item.article.title, item.article.source));
        lines.push(format!("   {}", item.article.link));
        lines.push(format!("   {}", item.rationale));
    }

    lines.join("\n")
}

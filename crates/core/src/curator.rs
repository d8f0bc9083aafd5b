use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{ArticleSource, ArticleSourceError};
use crate::domain::article::ArticleEntry;
use crate::domain::digest::{DigestItem, DigestResult, RationaleSource};
use crate::domain::profile::{Role, UserProfile};
use crate::errors::ApplicationError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RationaleError {
    #[error("rationale writer unavailable: {0}")]
    Unavailable(String),
    #[error("rationale writer returned {actual} lines for {expected} articles")]
    CountMismatch { expected: usize, actual: usize },
}

/// Produces one "why this matters to you" line per article, in order.
#[async_trait]
pub trait RationaleWriter: Send + Sync {
    fn source(&self) -> RationaleSource;

    async fn write(
        &self,
        profile: &UserProfile,
        articles: &[ArticleEntry],
    ) -> Result<Vec<String>, RationaleError>;
}

#[derive(Clone, Debug, Default)]
pub struct TemplatedRationale;

impl TemplatedRationale {
    pub fn rationale_for(&self, profile: &UserProfile, article: &ArticleEntry) -> String {
        let matched = profile.interests.iter().find(|interest| article.mentions(interest));
        let role_match = profile.role != Role::Other && article.is_tagged(profile.role);

        match (matched, role_match) {
            (Some(interest), true) => format!(
                "Relevant to your {} work and touches on {interest}.",
                profile.role.label()
            ),
            (Some(interest), false) => format!("Picked for your interest in {interest}."),
            (None, true) => format!("Relevant to your work in {}.", profile.role.label()),
            (None, false) => {
                "A general top story while we learn more about what you follow.".to_owned()
            }
        }
    }
}

#[async_trait]
impl RationaleWriter for TemplatedRationale {
    fn source(&self) -> RationaleSource {
        RationaleSource::Templated
    }

    async fn write(
        &self,
        profile: &UserProfile,
        articles: &[ArticleEntry],
    ) -> Result<Vec<String>, RationaleError> {
        Ok(articles.iter().map(|article| self.rationale_for(profile, article)).collect())
    }
}

pub struct DigestCurator {
    source: Arc<dyn ArticleSource>,
    writer: Option<Arc<dyn RationaleWriter>>,
    templates: TemplatedRationale,
    max_articles: usize,
}

impl DigestCurator {
    pub fn new(source: Arc<dyn ArticleSource>, max_articles: usize) -> Self {
        Self { source, writer: None, templates: TemplatedRationale, max_articles: max_articles.max(1) }
    }

    pub fn with_rationale_writer(mut self, writer: Arc<dyn RationaleWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub async fn curate(&self, profile: &UserProfile) -> Result<DigestResult, ApplicationError> {
        let (articles, used_general_fallback) =
            self.select(profile).await.map_err(|error| {
                ApplicationError::upstream("article source", error.to_string())
            })?;

        let items = self.annotate(profile, articles).await;

        debug!(
            event_name = "digest.curated",
            user_id = %profile.user_id,
            role = profile.role.as_str(),
            items = items.len(),
            used_general_fallback,
            "digest curated"
        );

        Ok(DigestResult {
            user_id: profile.user_id.clone(),
            role: profile.role,
            items,
            used_general_fallback,
        })
    }

    async fn select(
        &self,
        profile: &UserProfile,
    ) -> Result<(Vec<ArticleEntry>, bool), ArticleSourceError> {
        let tags = BTreeSet::from([profile.role]);
        let mut candidates = self.source.candidates(&tags).await?;

        if candidates.is_empty() {
            let general = self.source.general(self.max_articles).await?;
            return Ok((general, true));
        }

        // Stable sort keeps catalog order among equal hit counts.
        candidates.sort_by_key(|article| Reverse(interest_hits(profile, article)));
        candidates.truncate(self.max_articles);
        Ok((candidates, false))
    }

    async fn annotate(&self, profile: &UserProfile, articles: Vec<ArticleEntry>) -> Vec<DigestItem> {
        if let Some(writer) = &self.writer {
            match writer.write(profile, &articles).await {
                Ok(lines) if lines.len() == articles.len() => {
                    let source = writer.source();
                    return articles
                        .into_iter()
                        .zip(lines)
                        .map(|(article, rationale)| DigestItem {
                            article,
                            rationale,
                            rationale_source: source,
                        })
                        .collect();
                }
                Ok(lines) => warn!(
                    event_name = "digest.rationale.degraded",
                    user_id = %profile.user_id,
                    error = %RationaleError::CountMismatch {
                        expected: articles.len(),
                        actual: lines.len(),
                    },
                    "falling back to templated rationale"
                ),
                Err(error) => warn!(
                    event_name = "digest.rationale.degraded",
                    user_id = %profile.user_id,
                    error = %error,
                    "falling back to templated rationale"
                ),
            }
        }

        articles
            .into_iter()
            .map(|article| DigestItem {
                rationale: self.templates.rationale_for(profile, &article),
                article,
                rationale_source: RationaleSource::Templated,
            })
            .collect()
    }
}

fn interest_hits(profile: &UserProfile, article: &ArticleEntry) -> usize {
    profile.interests.iter().filter(|interest| article.mentions(interest)).count()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{DigestCurator, RationaleError, RationaleWriter, TemplatedRationale};
    use crate::catalog::{ArticleSource, ArticleSourceError, StaticCatalog};
    use crate::domain::article::{ArticleEntry, ArticleId};
    use crate::domain::digest::RationaleSource;
    use crate::domain::profile::{ExperienceLevel, Role, UserId, UserProfile};
    use crate::errors::ApplicationError;

    fn profile(role: Role, interests: &[&str]) -> UserProfile {
        UserProfile {
            user_id: UserId::new("U1"),
            role,
            interests: interests.iter().map(|value| (*value).to_owned()).collect(),
            experience: ExperienceLevel::Senior,
            industry: None,
            summary: None,
            source_description: "test".to_owned(),
            created_at: Utc.with_ymd_and_hms(2025, 7, 15, 9, 0, 0).single().unwrap_or_default(),
        }
    }

    fn entry(id: &str, title: &str, tags: &[Role]) -> ArticleEntry {
        ArticleEntry {
            id: ArticleId(id.to_owned()),
            title: title.to_owned(),
            link: format!("https://example.com/{id}"),
            source: "Example".to_owned(),
            summary: String::new(),
            published: NaiveDate::from_ymd_opt(2025, 7, 15).unwrap_or_default(),
            tags: tags.iter().copied().collect(),
        }
    }

    fn curator(max: usize) -> DigestCurator {
        DigestCurator::new(Arc::new(StaticCatalog::builtin()), max)
    }

    struct FailingWriter;

    #[async_trait]
    impl RationaleWriter for FailingWriter {
        fn source(&self) -> RationaleSource {
            RationaleSource::Generated
        }

        async fn write(
            &self,
            _profile: &UserProfile,
            _articles: &[ArticleEntry],
        ) -> Result<Vec<String>, RationaleError> {
            Err(RationaleError::Unavailable("model timed out".to_owned()))
        }
    }

    struct ShortWriter;

    #[async_trait]
    impl RationaleWriter for ShortWriter {
        fn source(&self) -> RationaleSource {
            RationaleSource::Generated
        }

        async fn write(
            &self,
            _profile: &UserProfile,
            _articles: &[ArticleEntry],
        ) -> Result<Vec<String>, RationaleError> {
            Ok(vec!["only one".to_owned()])
        }
    }

    struct EchoWriter;

    #[async_trait]
    impl RationaleWriter for EchoWriter {
        fn source(&self) -> RationaleSource {
            RationaleSource::Generated
        }

        async fn write(
            &self,
            _profile: &UserProfile,
            articles: &[ArticleEntry],
        ) -> Result<Vec<String>, RationaleError> {
            Ok(articles.iter().map(|article| format!("because {}", article.id.0)).collect())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl ArticleSource for BrokenSource {
        async fn candidates(
            &self,
            _tags: &BTreeSet<Role>,
        ) -> Result<Vec<ArticleEntry>, ArticleSourceError> {
            Err(ArticleSourceError::Unavailable("feed down".to_owned()))
        }

        async fn general(&self, _limit: usize) -> Result<Vec<ArticleEntry>, ArticleSourceError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn crypto_profile_gets_only_crypto_articles_ranked_by_interest() {
        let digest = curator(5)
            .curate(&profile(Role::Crypto, &["DeFi", "trading"]))
            .await
            .expect("curation succeeds");

        assert!(!digest.used_general_fallback);
        assert_eq!(digest.len(), 3);
        assert!(digest.items.iter().all(|item| item.article.is_tagged(Role::Crypto)));
        assert_eq!(digest.items[0].article.id.0, "defi-lending-tvl");
        assert!(digest.items.iter().all(|item| item.rationale_source == RationaleSource::Templated));
        assert!(digest.items[0].rationale.contains("DeFi"));
    }

    #[tokio::test]
    async fn other_role_falls_back_to_general_subset() {
        let digest =
            curator(5).curate(&profile(Role::Other, &[])).await.expect("curation succeeds");

        assert!(digest.used_general_fallback);
        assert_eq!(digest.len(), 5);
        assert_eq!(digest.items[0].article.id.0, "gpt5-release");
    }

    #[tokio::test]
    async fn digest_is_capped_at_max_articles() {
        let catalog = StaticCatalog::new(
            (0..8).map(|idx| entry(&format!("e{idx}"), "Engineering news", &[Role::Engineering])).collect(),
        );
        let digest = DigestCurator::new(Arc::new(catalog), 5)
            .curate(&profile(Role::Engineering, &[]))
            .await
            .expect("curation succeeds");

        assert_eq!(digest.len(), 5);
        assert_eq!(digest.article_titles().len(), 5);
        assert_eq!(digest.items[4].article.id.0, "e4");
    }

    #[tokio::test]
    async fn curation_is_deterministic_without_ai_rationale() {
        let subject = profile(Role::Engineering, &["Rust", "React"]);
        let first = curator(5).curate(&subject).await.expect("first curation");
        let second = curator(5).curate(&subject).await.expect("second curation");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn failing_rationale_writer_degrades_to_templates() {
        let digest = curator(5)
            .with_rationale_writer(Arc::new(FailingWriter))
            .curate(&profile(Role::Design, &[]))
            .await
            .expect("writer failure must not fail the digest");

        assert!(!digest.is_empty());
        assert!(digest.items.iter().all(|item| item.rationale_source == RationaleSource::Templated));
    }

    #[tokio::test]
    async fn short_rationale_response_degrades_to_templates() {
        let digest = curator(5)
            .with_rationale_writer(Arc::new(ShortWriter))
            .curate(&profile(Role::Crypto, &[]))
            .await
            .expect("count mismatch must not fail the digest");

        assert_eq!(digest.len(), 3);
        assert!(digest.items.iter().all(|item| item.rationale_source == RationaleSource::Templated));
    }

    #[tokio::test]
    async fn generated_rationale_is_attached_in_order() {
        let digest = curator(5)
            .with_rationale_writer(Arc::new(EchoWriter))
            .curate(&profile(Role::Crypto, &[]))
            .await
            .expect("curation succeeds");

        assert_eq!(digest.items[0].rationale, "because ethereum-l2-fees");
        assert!(digest.items.iter().all(|item| item.rationale_source == RationaleSource::Generated));
    }

    #[tokio::test]
    async fn source_failure_is_reported_as_upstream() {
        let error = DigestCurator::new(Arc::new(BrokenSource), 5)
            .curate(&profile(Role::Product, &[]))
            .await
            .expect_err("source failure propagates");

        assert!(matches!(error, ApplicationError::UpstreamUnavailable { ref service, .. } if service == "article source"));
    }

    #[test]
    fn templated_rationale_prefers_interest_then_role() {
        let templates = TemplatedRationale;
        let article = entry("rust", "Rust 2024 ships", &[Role::Engineering]);

        let with_interest = templates.rationale_for(&profile(Role::Engineering, &["rust"]), &article);
        let role_only = templates.rationale_for(&profile(Role::Engineering, &["go"]), &article);
        let neither = templates.rationale_for(&profile(Role::Other, &[]), &article);

        assert_eq!(with_interest, "Relevant to your Engineering work and touches on rust.");
        assert_eq!(role_only, "Relevant to your work in Engineering.");
        assert_eq!(neither, "A general top story while we learn more about what you follow.");
    }
}

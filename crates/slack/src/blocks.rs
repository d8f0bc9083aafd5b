use std::fmt::Write as _;

use chrono::NaiveDate;
use pulse_core::domain::digest::DigestResult;
use pulse_core::domain::profile::{Role, UserProfile};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { block_id: String, text: TextObject },
    Section { block_id: String, text: TextObject },
    Divider { block_id: String },
    Context { block_id: String, elements: Vec<TextObject> },
}

impl Block {
    pub fn block_id(&self) -> &str {
        match self {
            Self::Header { block_id, .. }
            | Self::Section { block_id, .. }
            | Self::Divider { block_id }
            | Self::Context { block_id, .. } => block_id,
        }
    }
}

/// A chat message: Block Kit layout plus the plain fallback Slack shows in
/// notifications.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

impl MessageTemplate {
    /// Concatenated text of every block, mostly useful for assertions and logs.
    pub fn rendered_text(&self) -> String {
        let mut rendered = String::new();
        for block in &self.blocks {
            match block {
                Block::Header { text, .. } | Block::Section { text, .. } => {
                    rendered.push_str(text.text());
                    rendered.push('\n');
                }
                Block::Context { elements, .. } => {
                    for element in elements {
                        rendered.push_str(element.text());
                        rendered.push('\n');
                    }
                }
                Block::Divider { .. } => {}
            }
        }
        rendered
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Header { block_id: block_id.into(), text: TextObject::plain(text) });
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn divider(mut self, block_id: impl Into<String>) -> Self {
        self.blocks.push(Block::Divider { block_id: block_id.into() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    /// Appends every block of another template, keeping this builder's fallback.
    pub fn extend(mut self, template: MessageTemplate) -> Self {
        self.blocks.extend(template.blocks);
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

pub fn role_emoji(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Engineering) => "⚙️",
        Some(Role::Design) => "🎨",
        Some(Role::Product) => "📱",
        Some(Role::Business) => "💼",
        Some(Role::AiMl) => "🤖",
        Some(Role::Crypto) => "₿",
        Some(Role::Other) | None => "📰",
    }
}

pub fn onboarding_message() -> MessageTemplate {
    MessageBuilder::new("Welcome to PulseBot! Tell me about yourself to get started.")
        .header("pulse.onboarding.header.v1", "👋 Welcome to PulseBot!")
        .section("pulse.onboarding.intro.v1", |section| {
            section.mrkdwn(
                "I'm here to deliver personalized industry news that matters to you! To get started, I need to learn about you.",
            );
        })
        .section("pulse.onboarding.prompt.v1", |section| {
            section.mrkdwn(
                "*Tell me about yourself:*\n• What's your role/job title?\n• What industry do you work in?\n• What technologies or topics interest you?\n• What stage company do you work at?\n\nJust reply with a message describing yourself and I'll build your personalized profile!",
            );
        })
        .context("pulse.onboarding.example.v1", |context| {
            context.mrkdwn(
                "💡 Example: _'I'm a senior software engineer at a startup, focused on machine learning and Python. I'm interested in AI trends, new frameworks, and startup news.'_",
            );
        })
        .build()
}

fn profile_lines(profile: &UserProfile) -> String {
    let mut lines = format!(
        "• *Role:* {}\n• *Industry:* {}\n• *Experience:* {}\n• *Interests:* {}",
        profile.role.label(),
        profile.industry.as_deref().unwrap_or("N/A"),
        profile.experience,
        profile.interests_label()
    );
    if let Some(summary) = &profile.summary {
        let _ = write!(lines, "\n\n_{summary}_");
    }
    lines
}

/// Confirmation for a freshly extracted profile, followed by the first digest.
pub fn profile_created_message(
    profile: &UserProfile,
    digest: &DigestResult,
    today: NaiveDate,
) -> MessageTemplate {
    MessageBuilder::new("Profile created successfully!")
        .header("pulse.profile.created.header.v1", "✅ Profile Created!")
        .section("pulse.profile.created.summary.v1", |section| {
            section.mrkdwn(format!("*Here's what I learned about you:*\n{}", profile_lines(profile)));
        })
        .context("pulse.profile.created.hint.v1", |context| {
            context.mrkdwn(
                "💡 Use `/preferences` to review your profile, or `/preferences <description>` to update it.",
            );
        })
        .divider("pulse.profile.created.divider.v1")
        .extend(digest_message(profile, digest, today))
        .build()
}

pub fn digest_message(profile: &UserProfile, digest: &DigestResult, today: NaiveDate) -> MessageTemplate {
    let mut builder = MessageBuilder::new("Your personalized digest")
        .header(
            "pulse.digest.header.v1",
            format!("🌅 Your Personalized Digest - {}", today.format("%B %d, %Y")),
        )
        .context("pulse.digest.context.v1", |context| {
            context.mrkdwn(format!(
                "Curated for: {} | {} articles",
                profile.role.label(),
                digest.len()
            ));
        });

    if digest.used_general_fallback {
        builder = builder.section("pulse.digest.fallback.v1", |section| {
            section.mrkdwn(
                "Nothing matched your profile closely yet, so here are today's top stories.",
            );
        });
    }

    builder = builder
        .divider("pulse.digest.divider.v1")
        .section("pulse.digest.articles.v1", |section| {
            section.mrkdwn("*📚 Read the Full Articles:*");
        });

    for (index, item) in digest.items.iter().enumerate() {
        let article = &item.article;
        builder = builder.section(format!("pulse.digest.article.{}.v1", index + 1), |section| {
            section.mrkdwn(format!(
                "{} <{}|{}>\n_{}_\n{}",
                role_emoji(article.primary_tag()),
                article.link,
                article.title,
                article.source,
                item.rationale
            ));
        });
    }

    builder
        .context("pulse.digest.footer.v1", |context| {
            context.mrkdwn("🔄 Use `/digest` for a fresh digest");
        })
        .build()
}

pub fn profile_summary_message(profile: &UserProfile, updated: bool) -> MessageTemplate {
    let (fallback, heading) = if updated {
        (format!("Profile updated! New role: {}", profile.role.label()), "*✅ Profile updated!*")
    } else {
        (format!("Current profile: {}", profile.role.label()), "*Current Profile:*")
    };

    MessageBuilder::new(fallback)
        .section("pulse.profile.summary.v1", |section| {
            section.mrkdwn(format!("{heading}\n{}", profile_lines(profile)));
        })
        .context("pulse.profile.summary.hint.v1", |context| {
            context.mrkdwn("To update: `/preferences [describe yourself again]`");
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("pulse.error.summary.v1", |section| {
            section.mrkdwn(format!("❌ {summary}"));
        })
        .context("pulse.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("PulseBot help")
        .section("pulse.help.summary.v1", |section| {
            section.mrkdwn(
                "*Available commands*\n• `/digest` get your personalized digest (or start onboarding)\n• `/digest setup` describe yourself again\n• `/preferences` show your profile\n• `/preferences <description>` update your profile\n• `/digest help` show this message",
            );
        })
        .build()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{NaiveDate, TimeZone, Utc};
    use pulse_core::domain::article::{ArticleEntry, ArticleId};
    use pulse_core::domain::digest::{DigestItem, DigestResult, RationaleSource};
    use pulse_core::domain::profile::{ExperienceLevel, Role, UserId, UserProfile};

    use super::{
        digest_message, error_message, onboarding_message, profile_created_message,
        profile_summary_message, Block, MessageBuilder, TextObject,
    };

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 15).unwrap_or_default()
    }

    fn profile(role: Role) -> UserProfile {
        UserProfile {
            user_id: UserId::new("U1"),
            role,
            interests: vec!["DeFi".to_owned(), "trading".to_owned()],
            experience: ExperienceLevel::Senior,
            industry: Some("Fintech".to_owned()),
            summary: Some("Crypto trader focused on DeFi.".to_owned()),
            source_description: "crypto trader".to_owned(),
            created_at: Utc.with_ymd_and_hms(2025, 7, 15, 9, 0, 0).single().unwrap_or_default(),
        }
    }

    fn digest(role: Role, fallback: bool) -> DigestResult {
        let items = ["ethereum-l2-fees", "defi-lending-tvl"]
            .iter()
            .map(|id| DigestItem {
                article: ArticleEntry {
                    id: ArticleId((*id).to_owned()),
                    title: format!("Title {id}"),
                    link: format!("https://example.com/{id}"),
                    source: "CoinDesk".to_owned(),
                    summary: "summary".to_owned(),
                    published: date(),
                    tags: BTreeSet::from([role]),
                },
                rationale: format!("Why {id}"),
                rationale_source: RationaleSource::Templated,
            })
            .collect();
        DigestResult {
            user_id: UserId::new("U1"),
            role,
            items,
            used_general_fallback: fallback,
        }
    }

    #[test]
    fn plain_text_serializes_with_slack_type_name() {
        let json = serde_json::to_value(TextObject::plain("hi")).unwrap_or_default();
        assert_eq!(json["type"], "plain_text");

        let divider = serde_json::to_value(Block::Divider { block_id: "d".to_owned() })
            .unwrap_or_default();
        assert_eq!(divider["type"], "divider");
    }

    #[test]
    fn message_builder_creates_typed_block_structure() {
        let message = MessageBuilder::new("fallback")
            .header("pulse.header.v1", "Title")
            .section("pulse.summary.v1", |section| {
                section.mrkdwn("*Summary*");
            })
            .divider("pulse.divider.v1")
            .build();

        assert_eq!(message.blocks.len(), 3);
        assert!(matches!(
            &message.blocks[0],
            Block::Header { block_id, text: TextObject::Plain { .. } } if block_id == "pulse.header.v1"
        ));
        assert!(matches!(
            &message.blocks[1],
            Block::Section { text: TextObject::Mrkdwn { text }, .. } if text == "*Summary*"
        ));
    }

    #[test]
    fn onboarding_prompt_asks_for_a_description_with_example() {
        let message = onboarding_message();
        let text = message.rendered_text();

        assert!(text.contains("Welcome to PulseBot"));
        assert!(text.contains("Tell me about yourself"));
        assert!(text.contains("Example"));
    }

    #[test]
    fn digest_lists_every_article_with_role_emoji_and_rationale() {
        let message = digest_message(&profile(Role::Crypto), &digest(Role::Crypto, false), date());
        let text = message.rendered_text();

        assert!(text.contains("Your Personalized Digest - July 15, 2025"));
        assert!(text.contains("Curated for: Crypto | 2 articles"));
        assert!(text.contains("₿ <https://example.com/ethereum-l2-fees|Title ethereum-l2-fees>"));
        assert!(text.contains("Why defi-lending-tvl"));
        assert!(!text.contains("top stories"));
        assert_eq!(
            message.blocks.iter().filter(|block| block.block_id().starts_with("pulse.digest.article.")).count(),
            2
        );
    }

    #[test]
    fn general_fallback_is_called_out() {
        let message = digest_message(&profile(Role::Other), &digest(Role::Other, true), date());
        assert!(message
            .blocks
            .iter()
            .any(|block| block.block_id() == "pulse.digest.fallback.v1"));
    }

    #[test]
    fn profile_created_includes_profile_then_digest() {
        let message =
            profile_created_message(&profile(Role::Crypto), &digest(Role::Crypto, false), date());
        let text = message.rendered_text();

        assert_eq!(message.fallback_text, "Profile created successfully!");
        let profile_at = text.find("*Role:* Crypto").unwrap_or(usize::MAX);
        let digest_at = text.find("Your Personalized Digest").unwrap_or(0);
        assert!(profile_at < digest_at);
        assert!(text.contains("*Interests:* DeFi, trading"));
    }

    #[test]
    fn updated_profile_summary_mentions_new_role() {
        let message = profile_summary_message(&profile(Role::Design), true);
        assert!(message.fallback_text.contains("New role: Design"));

        let current = profile_summary_message(&profile(Role::Design), false);
        assert!(current.rendered_text().contains("Current Profile"));
    }

    #[test]
    fn error_template_contains_correlation_id() {
        let message = error_message("Cannot process request", "req-123");
        assert!(matches!(
            &message.blocks[1],
            Block::Context { elements, .. }
                if matches!(elements.first(), Some(TextObject::Plain { text }) if text.contains("req-123"))
        ));
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use pulse_agent::conversation::{ConversationHandler, ConversationReply};
use pulse_core::domain::profile::UserId;
use pulse_slack::blocks::{self, MessageTemplate};
use pulse_slack::commands::{CommandEnvelope, CommandRouteError, PulseCommandService};
use pulse_slack::events::{DirectMessageEvent, DirectMessageService, EventContext, EventHandlerError};
use tracing::info;

/// Turns a conversation reply into the chat message the user sees.
pub fn render_reply(
    reply: &ConversationReply,
    today: NaiveDate,
    correlation_id: &str,
) -> MessageTemplate {
    match reply {
        ConversationReply::OnboardingPrompt => blocks::onboarding_message(),
        ConversationReply::ProfileCreated { profile, digest } => {
            blocks::profile_created_message(profile, digest, today)
        }
        ConversationReply::Digest { profile, digest } => {
            blocks::digest_message(profile, digest, today)
        }
        ConversationReply::ProfileSummary(profile) => blocks::profile_summary_message(profile, false),
        ConversationReply::ProfileUpdated(profile) => blocks::profile_summary_message(profile, true),
        ConversationReply::Help => blocks::help_message(),
        ConversationReply::Failure(failure) => {
            blocks::error_message(&failure.user_message(), correlation_id)
        }
    }
}

/// Slack-facing adapter over the conversation handler. Cheap to clone so the
/// slash-command and direct-message handlers can each own one.
#[derive(Clone)]
pub struct ConversationService {
    conversation: Arc<ConversationHandler>,
}

impl ConversationService {
    pub fn new(conversation: Arc<ConversationHandler>) -> Self {
        Self { conversation }
    }

    fn respond(&self, user: &UserId, reply: ConversationReply, correlation_id: &str) -> MessageTemplate {
        info!(
            event_name = "conversation.reply_rendered",
            user_id = %user,
            correlation_id,
            reply_kind = reply.kind(),
            "conversation reply rendered"
        );
        render_reply(&reply, Utc::now().date_naive(), correlation_id)
    }
}

#[async_trait]
impl PulseCommandService for ConversationService {
    async fn digest(&self, envelope: &CommandEnvelope) -> Result<MessageTemplate, CommandRouteError> {
        let user = UserId::new(envelope.user_id.as_str());
        let reply = self.conversation.handle_digest_request(&user).await;
        Ok(self.respond(&user, reply, &envelope.request_id))
    }

    async fn onboard(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let user = UserId::new(envelope.user_id.as_str());
        let reply = self.conversation.handle_onboarding_request(&user).await;
        Ok(self.respond(&user, reply, &envelope.request_id))
    }

    async fn preferences(
        &self,
        description: Option<String>,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let user = UserId::new(envelope.user_id.as_str());
        let reply = self.conversation.handle_preferences(&user, description.as_deref()).await;
        Ok(self.respond(&user, reply, &envelope.request_id))
    }

    async fn unrecognized(
        &self,
        _verb: &str,
        envelope: &CommandEnvelope,
    ) -> Result<MessageTemplate, CommandRouteError> {
        let user = UserId::new(envelope.user_id.as_str());
        let reply = self.conversation.handle_unrecognized(&user).await;
        Ok(self.respond(&user, reply, &envelope.request_id))
    }
}

#[async_trait]
impl DirectMessageService for ConversationService {
    async fn handle_direct_message(
        &self,
        event: &DirectMessageEvent,
        ctx: &EventContext,
    ) -> Result<Option<MessageTemplate>, EventHandlerError> {
        let user = UserId::new(event.user_id.as_str());
        let reply = self.conversation.handle_direct_message(&user, &event.text).await;
        Ok(Some(self.respond(&user, reply, &ctx.correlation_id)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pulse_agent::conversation::{ConversationReply, ReplyFailure};
    use pulse_core::domain::profile::ExtractionFailure;

    use super::render_reply;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 15).unwrap_or_default()
    }

    #[test]
    fn failures_render_user_message_with_correlation_id() {
        let message = render_reply(
            &ConversationReply::Failure(ReplyFailure::ExtractionFailed(
                ExtractionFailure::NoStructuredContent,
            )),
            today(),
            "req-7",
        );
        let text = message.rendered_text();

        assert!(text.contains("trouble understanding your description"));
        assert!(text.contains("req-7"));
    }

    #[test]
    fn no_profile_points_to_digest_command() {
        let message =
            render_reply(&ConversationReply::Failure(ReplyFailure::NoProfile), today(), "req-8");
        assert!(message.rendered_text().contains("/digest"));
    }

    #[test]
    fn prompt_and_help_use_fixed_templates() {
        let prompt = render_reply(&ConversationReply::OnboardingPrompt, today(), "req");
        assert!(prompt.fallback_text.contains("Welcome to PulseBot"));

        let help = render_reply(&ConversationReply::Help, today(), "req");
        assert_eq!(help.fallback_text, "PulseBot help");
    }
}

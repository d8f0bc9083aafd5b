use std::sync::Arc;

use pulse_core::curator::DigestCurator;
use pulse_core::domain::digest::DigestResult;
use pulse_core::domain::profile::{ExtractionFailure, UserId, UserProfile};
use pulse_core::errors::{ApplicationError, DomainError};
use pulse_core::flows::{
    FlowEngine, OnboardingAction, OnboardingContext, OnboardingEvent, OnboardingFlow,
    OnboardingState, TransitionOutcome,
};
use pulse_db::ProfileStore;
use tracing::{error, info, warn};

use crate::extractor::ProfileExtractor;
use crate::guardrails::{GuardrailDecision, GuardrailPolicy};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyFailure {
    ExtractionFailed(ExtractionFailure),
    NoProfile,
    UpstreamUnavailable { service: String },
    InputRejected { message: String },
    Internal,
}

impl ReplyFailure {
    pub fn user_message(&self) -> String {
        match self {
            Self::ExtractionFailed(_) => "Sorry, I had trouble understanding your description. Could you try describing yourself again with more details about your role and interests?".to_owned(),
            Self::NoProfile => {
                "I don't have a profile for you yet. Use `/digest` to get started.".to_owned()
            }
            Self::UpstreamUnavailable { .. } => {
                "I couldn't reach one of my services just now. Please try again in a moment."
                    .to_owned()
            }
            Self::InputRejected { message } => message.clone(),
            Self::Internal => "Something went wrong on my side. Please try again.".to_owned(),
        }
    }
}

impl From<ApplicationError> for ReplyFailure {
    fn from(error: ApplicationError) -> Self {
        match error {
            ApplicationError::Domain(DomainError::ExtractionFailed(failure)) => {
                Self::ExtractionFailed(failure)
            }
            ApplicationError::Domain(DomainError::NoProfile { .. }) => Self::NoProfile,
            ApplicationError::UpstreamUnavailable { service, .. } => {
                Self::UpstreamUnavailable { service }
            }
            ApplicationError::Domain(DomainError::OnboardingTransition(_))
            | ApplicationError::Configuration(_) => Self::Internal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversationReply {
    OnboardingPrompt,
    ProfileCreated { profile: UserProfile, digest: DigestResult },
    Digest { profile: UserProfile, digest: DigestResult },
    ProfileSummary(UserProfile),
    ProfileUpdated(UserProfile),
    Help,
    Failure(ReplyFailure),
}

impl ConversationReply {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OnboardingPrompt => "onboarding_prompt",
            Self::ProfileCreated { .. } => "profile_created",
            Self::Digest { .. } => "digest",
            Self::ProfileSummary(_) => "profile_summary",
            Self::ProfileUpdated(_) => "profile_updated",
            Self::Help => "help",
            Self::Failure(_) => "failure",
        }
    }
}

/// Routes user input through the onboarding flow. Every entry point returns a
/// reply; failures are folded into `ConversationReply::Failure`.
pub struct ConversationHandler {
    store: Arc<dyn ProfileStore>,
    extractor: ProfileExtractor,
    curator: Arc<DigestCurator>,
    flow: FlowEngine<OnboardingFlow>,
    guardrails: GuardrailPolicy,
}

impl ConversationHandler {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        extractor: ProfileExtractor,
        curator: Arc<DigestCurator>,
        guardrails: GuardrailPolicy,
    ) -> Self {
        Self { store, extractor, curator, flow: FlowEngine::default(), guardrails }
    }

    pub async fn handle_digest_request(&self, user: &UserId) -> ConversationReply {
        let outcome = match self.advance(user, OnboardingEvent::DigestRequested).await {
            Ok(outcome) => outcome,
            Err(reply) => return reply,
        };

        if outcome.requires(OnboardingAction::CurateDigest) {
            let Some(profile) = self.store.get(user).await else {
                return ConversationReply::Failure(ReplyFailure::NoProfile);
            };
            return match self.curator.curate(&profile).await {
                Ok(digest) => ConversationReply::Digest { profile, digest },
                Err(error) => self.fail(user, error),
            };
        }

        self.store.set_state(user, outcome.to).await;
        ConversationReply::OnboardingPrompt
    }

    pub async fn handle_onboarding_request(&self, user: &UserId) -> ConversationReply {
        match self.advance(user, OnboardingEvent::OnboardingRequested).await {
            Ok(outcome) => {
                self.store.set_state(user, outcome.to).await;
                info!(event_name = "onboarding.started", user_id = %user, "onboarding started");
                ConversationReply::OnboardingPrompt
            }
            Err(reply) => reply,
        }
    }

    pub async fn handle_direct_message(&self, user: &UserId, text: &str) -> ConversationReply {
        let outcome = match self.advance(user, OnboardingEvent::DirectMessage).await {
            Ok(outcome) => outcome,
            Err(reply) => return reply,
        };

        if !outcome.requires(OnboardingAction::ExtractProfile) {
            return ConversationReply::Help;
        }

        let description = match self.screen(text) {
            Ok(description) => description,
            Err(failure) => {
                return match self.advance(user, OnboardingEvent::ExtractionFailed).await {
                    Ok(_) => ConversationReply::Failure(failure),
                    Err(reply) => reply,
                };
            }
        };

        let profile = match self.extractor.extract(user, &description).await {
            Ok(profile) => profile,
            Err(ApplicationError::Domain(DomainError::ExtractionFailed(failure))) => {
                return match self.advance(user, OnboardingEvent::ExtractionFailed).await {
                    Ok(_) => ConversationReply::Failure(ReplyFailure::ExtractionFailed(failure)),
                    Err(reply) => reply,
                };
            }
            // Upstream failures leave the user awaiting a description.
            Err(error) => return self.fail(user, error),
        };

        let stored = match self.advance(user, OnboardingEvent::ProfileExtracted).await {
            Ok(outcome) => outcome,
            Err(reply) => return reply,
        };
        self.store.put(user, profile.clone()).await;
        self.store.set_state(user, stored.to).await;
        info!(
            event_name = "profile.stored",
            user_id = %user,
            role = profile.role.as_str(),
            "profile stored"
        );

        match self.curator.curate(&profile).await {
            Ok(digest) => ConversationReply::ProfileCreated { profile, digest },
            Err(error) => self.fail(user, error),
        }
    }

    /// Shows the stored profile, or re-extracts it from `text` when given.
    pub async fn handle_preferences(&self, user: &UserId, text: Option<&str>) -> ConversationReply {
        let Some(existing) = self.store.get(user).await else {
            return ConversationReply::Failure(ReplyFailure::NoProfile);
        };

        let Some(text) = text.map(str::trim).filter(|value| !value.is_empty()) else {
            return ConversationReply::ProfileSummary(existing);
        };

        let description = match self.screen(text) {
            Ok(description) => description,
            Err(failure) => return ConversationReply::Failure(failure),
        };

        match self.extractor.extract(user, &description).await {
            Ok(profile) => {
                self.store.put(user, profile.clone()).await;
                self.store.set_state(user, OnboardingState::Completed).await;
                info!(
                    event_name = "profile.updated",
                    user_id = %user,
                    role = profile.role.as_str(),
                    "profile updated from preferences"
                );
                ConversationReply::ProfileUpdated(profile)
            }
            Err(error) => self.fail(user, error),
        }
    }

    pub async fn handle_unrecognized(&self, user: &UserId) -> ConversationReply {
        match self.advance(user, OnboardingEvent::UnrecognizedInput).await {
            Ok(_) => ConversationReply::Help,
            Err(reply) => reply,
        }
    }

    async fn advance(
        &self,
        user: &UserId,
        event: OnboardingEvent,
    ) -> Result<TransitionOutcome, ConversationReply> {
        let state = self.store.get_state(user).await;
        let context = OnboardingContext { has_profile: self.store.get(user).await.is_some() };

        self.flow.apply(state, event, &context).map_err(|transition| {
            let error = ApplicationError::from(DomainError::from(transition));
            self.fail(user, error)
        })
    }

    fn screen(&self, text: &str) -> Result<String, ReplyFailure> {
        match self.guardrails.evaluate(text) {
            GuardrailDecision::Allow => Ok(text.trim().to_owned()),
            GuardrailDecision::Degrade { reason_code, text } => {
                warn!(event_name = "guardrail.degraded", reason_code, "description degraded");
                Ok(text)
            }
            GuardrailDecision::Deny { reason_code, user_message } => {
                warn!(event_name = "guardrail.denied", reason_code, "description denied");
                Err(ReplyFailure::InputRejected { message: user_message })
            }
        }
    }

    fn fail(&self, user: &UserId, error: ApplicationError) -> ConversationReply {
        let failure = ReplyFailure::from(error.clone());
        match &failure {
            ReplyFailure::Internal => {
                error!(event_name = "conversation.failed", user_id = %user, error = %error, "conversation failed")
            }
            _ => {
                warn!(event_name = "conversation.degraded", user_id = %user, error = %error, "conversation degraded")
            }
        }
        ConversationReply::Failure(failure)
    }
}

use thiserror::Error;
use tracing::debug;

use crate::flows::states::{
    OnboardingAction, OnboardingContext, OnboardingEvent, OnboardingState, TransitionOutcome,
};

pub trait FlowDefinition {
    fn initial_state(&self) -> OnboardingState;
    fn transition(
        &self,
        current: OnboardingState,
        event: OnboardingEvent,
        context: &OnboardingContext,
    ) -> Result<TransitionOutcome, OnboardingTransitionError>;
}

#[derive(Clone, Debug, Default)]
pub struct OnboardingFlow;

impl FlowDefinition for OnboardingFlow {
    fn initial_state(&self) -> OnboardingState {
        OnboardingState::NotStarted
    }

    fn transition(
        &self,
        current: OnboardingState,
        event: OnboardingEvent,
        context: &OnboardingContext,
    ) -> Result<TransitionOutcome, OnboardingTransitionError> {
        transition_onboarding(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> OnboardingState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: OnboardingState,
        event: OnboardingEvent,
        context: &OnboardingContext,
    ) -> Result<TransitionOutcome, OnboardingTransitionError> {
        let result = self.flow.transition(current, event, context);
        if let Ok(outcome) = &result {
            debug!(
                event_name = "flow.onboarding.transition_applied",
                from = outcome.from.as_str(),
                to = outcome.to.as_str(),
                event = ?outcome.event,
                actions = ?outcome.actions,
                "onboarding transition applied"
            );
        }
        result
    }
}

impl Default for FlowEngine<OnboardingFlow> {
    fn default() -> Self {
        Self::new(OnboardingFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OnboardingTransitionError {
    #[error("invalid onboarding transition from {state:?} using event {event:?}")]
    InvalidTransition { state: OnboardingState, event: OnboardingEvent },
}

fn transition_onboarding(
    current: OnboardingState,
    event: OnboardingEvent,
    context: &OnboardingContext,
) -> Result<TransitionOutcome, OnboardingTransitionError> {
    use OnboardingAction::{
        CurateDigest, ExtractProfile, PromptForDescription, ReportExtractionFailure, SendHelp,
        StoreProfile,
    };
    use OnboardingEvent::{
        DigestRequested, DirectMessage, ExtractionFailed, OnboardingRequested, ProfileExtracted,
        UnrecognizedInput,
    };
    use OnboardingState::{AwaitingDescription, Completed, NotStarted};

    let (to, actions) = match (current, event) {
        (Completed, DigestRequested) if context.has_profile => (Completed, vec![CurateDigest]),
        (NotStarted, DigestRequested)
        | (Completed, DigestRequested)
        | (AwaitingDescription, DigestRequested) => {
            (AwaitingDescription, vec![PromptForDescription])
        }
        (_, OnboardingRequested) => (AwaitingDescription, vec![PromptForDescription]),
        (AwaitingDescription, DirectMessage) => (AwaitingDescription, vec![ExtractProfile]),
        (NotStarted, DirectMessage) | (Completed, DirectMessage) => (current, vec![SendHelp]),
        (AwaitingDescription, ProfileExtracted) => (Completed, vec![StoreProfile, CurateDigest]),
        (AwaitingDescription, ExtractionFailed) => {
            (AwaitingDescription, vec![ReportExtractionFailure])
        }
        (_, UnrecognizedInput) => (current, vec![SendHelp]),
        (NotStarted, ProfileExtracted)
        | (Completed, ProfileExtracted)
        | (NotStarted, ExtractionFailed)
        | (Completed, ExtractionFailed) => {
            return Err(OnboardingTransitionError::InvalidTransition { state: current, event });
        }
    };

    Ok(TransitionOutcome { from: current, to, event, actions })
}

#[cfg(test)]
mod tests {
    use crate::flows::engine::{FlowDefinition, FlowEngine, OnboardingFlow, OnboardingTransitionError};
    use crate::flows::states::{
        OnboardingAction, OnboardingContext, OnboardingEvent, OnboardingState,
    };

    fn no_profile() -> OnboardingContext {
        OnboardingContext { has_profile: false }
    }

    fn with_profile() -> OnboardingContext {
        OnboardingContext { has_profile: true }
    }

    #[test]
    fn unseen_user_starts_not_started() {
        assert_eq!(FlowEngine::default().initial_state(), OnboardingState::NotStarted);
        assert_eq!(OnboardingState::default(), OnboardingState::NotStarted);
    }

    #[test]
    fn digest_request_for_new_user_prompts_for_description() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(OnboardingState::NotStarted, OnboardingEvent::DigestRequested, &no_profile())
            .expect("not started -> awaiting");

        assert_eq!(outcome.to, OnboardingState::AwaitingDescription);
        assert_eq!(outcome.actions, vec![OnboardingAction::PromptForDescription]);
        assert!(!outcome.requires(OnboardingAction::StoreProfile));
    }

    #[test]
    fn happy_path_reaches_completed_and_curates() {
        let engine = FlowEngine::new(OnboardingFlow);
        let mut state = engine.initial_state();

        state = engine
            .apply(state, OnboardingEvent::DigestRequested, &no_profile())
            .expect("prompt")
            .to;
        let extract = engine
            .apply(state, OnboardingEvent::DirectMessage, &no_profile())
            .expect("message while awaiting");
        assert!(extract.requires(OnboardingAction::ExtractProfile));

        let stored = engine
            .apply(extract.to, OnboardingEvent::ProfileExtracted, &no_profile())
            .expect("extraction succeeded");
        assert_eq!(stored.to, OnboardingState::Completed);
        assert_eq!(
            stored.actions,
            vec![OnboardingAction::StoreProfile, OnboardingAction::CurateDigest]
        );
    }

    #[test]
    fn extraction_failure_stays_awaiting() {
        let outcome = FlowEngine::default()
            .apply(
                OnboardingState::AwaitingDescription,
                OnboardingEvent::ExtractionFailed,
                &no_profile(),
            )
            .expect("failure is a valid transition");

        assert_eq!(outcome.to, OnboardingState::AwaitingDescription);
        assert_eq!(outcome.actions, vec![OnboardingAction::ReportExtractionFailure]);
    }

    #[test]
    fn completed_user_with_profile_skips_onboarding() {
        let outcome = FlowEngine::default()
            .apply(OnboardingState::Completed, OnboardingEvent::DigestRequested, &with_profile())
            .expect("completed digest");

        assert_eq!(outcome.to, OnboardingState::Completed);
        assert_eq!(outcome.actions, vec![OnboardingAction::CurateDigest]);
    }

    #[test]
    fn completed_user_without_profile_is_prompted_again() {
        let outcome = FlowEngine::default()
            .apply(OnboardingState::Completed, OnboardingEvent::DigestRequested, &no_profile())
            .expect("completed without profile");

        assert_eq!(outcome.to, OnboardingState::AwaitingDescription);
    }

    #[test]
    fn onboarding_request_reenters_awaiting_from_any_state() {
        let engine = FlowEngine::default();
        for state in [
            OnboardingState::NotStarted,
            OnboardingState::AwaitingDescription,
            OnboardingState::Completed,
        ] {
            let outcome = engine
                .apply(state, OnboardingEvent::OnboardingRequested, &with_profile())
                .expect("re-onboarding is always allowed");
            assert_eq!(outcome.to, OnboardingState::AwaitingDescription);
        }
    }

    #[test]
    fn stray_messages_get_help_without_state_change() {
        let engine = FlowEngine::default();
        for state in [OnboardingState::NotStarted, OnboardingState::Completed] {
            let outcome = engine
                .apply(state, OnboardingEvent::DirectMessage, &no_profile())
                .expect("stray message");
            assert_eq!(outcome.to, state);
            assert_eq!(outcome.actions, vec![OnboardingAction::SendHelp]);
        }
    }

    #[test]
    fn extraction_result_outside_onboarding_is_rejected() {
        let error = OnboardingFlow
            .transition(OnboardingState::Completed, OnboardingEvent::ProfileExtracted, &with_profile())
            .expect_err("no extraction outside awaiting");

        assert_eq!(
            error,
            OnboardingTransitionError::InvalidTransition {
                state: OnboardingState::Completed,
                event: OnboardingEvent::ProfileExtracted,
            }
        );
    }
}

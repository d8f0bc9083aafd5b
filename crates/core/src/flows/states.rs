use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingState {
    #[default]
    NotStarted,
    AwaitingDescription,
    Completed,
}

impl OnboardingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::AwaitingDescription => "awaiting_description",
            Self::Completed => "completed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnboardingEvent {
    DigestRequested,
    OnboardingRequested,
    DirectMessage,
    ProfileExtracted,
    ExtractionFailed,
    UnrecognizedInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OnboardingContext {
    pub has_profile: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnboardingAction {
    PromptForDescription,
    ExtractProfile,
    StoreProfile,
    CurateDigest,
    ReportExtractionFailure,
    SendHelp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: OnboardingState,
    pub to: OnboardingState,
    pub event: OnboardingEvent,
    pub actions: Vec<OnboardingAction>,
}

impl TransitionOutcome {
    pub fn requires(&self, action: OnboardingAction) -> bool {
        self.actions.contains(&action)
    }
}

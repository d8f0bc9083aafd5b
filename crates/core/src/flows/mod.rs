pub mod engine;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, OnboardingFlow, OnboardingTransitionError};
pub use states::{
    OnboardingAction, OnboardingContext, OnboardingEvent, OnboardingState, TransitionOutcome,
};

pub mod catalog;
pub mod config;
pub mod curator;
pub mod domain;
pub mod errors;
pub mod flows;

pub use catalog::{ArticleSource, ArticleSourceError, StaticCatalog};
pub use curator::{DigestCurator, RationaleError, RationaleWriter, TemplatedRationale};
pub use domain::article::{ArticleEntry, ArticleId};
pub use domain::digest::{DigestItem, DigestResult, RationaleSource};
pub use domain::profile::{
    normalize_interests, ExperienceLevel, ExtractionFailure, Role, UserId, UserProfile,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    FlowEngine, OnboardingAction, OnboardingContext, OnboardingEvent, OnboardingFlow,
    OnboardingState, OnboardingTransitionError, TransitionOutcome,
};

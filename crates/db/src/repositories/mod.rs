use async_trait::async_trait;
use serde::Serialize;

use pulse_core::domain::profile::{UserId, UserProfile};
use pulse_core::flows::OnboardingState;

pub mod memory;

pub use memory::InMemoryProfileStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_users: usize,
    pub profiled_users: usize,
    pub awaiting_description: usize,
}

/// Per-user profile and onboarding state. Every operation is total: a user
/// that was never seen reads as `NotStarted` with no profile.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user: &UserId) -> Option<UserProfile>;
    async fn put(&self, user: &UserId, profile: UserProfile);
    async fn get_state(&self, user: &UserId) -> OnboardingState;
    async fn set_state(&self, user: &UserId, state: OnboardingState);
    async fn stats(&self) -> StoreStats;
}

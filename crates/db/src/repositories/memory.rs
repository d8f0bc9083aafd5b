use std::collections::HashMap;

use tokio::sync::RwLock;

use pulse_core::domain::profile::{UserId, UserProfile};
use pulse_core::flows::OnboardingState;

use super::{ProfileStore, StoreStats};

#[derive(Clone, Debug, Default)]
struct UserRecord {
    state: OnboardingState,
    profile: Option<UserProfile>,
}

/// Process-local store. State and profile live under one key so a single
/// lock acquisition sees both.
#[derive(Default)]
pub struct InMemoryProfileStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user: &UserId) -> Option<UserProfile> {
        let users = self.users.read().await;
        users.get(user).and_then(|record| record.profile.clone())
    }

    async fn put(&self, user: &UserId, profile: UserProfile) {
        let mut users = self.users.write().await;
        users.entry(user.clone()).or_default().profile = Some(profile);
    }

    async fn get_state(&self, user: &UserId) -> OnboardingState {
        let users = self.users.read().await;
        users.get(user).map(|record| record.state).unwrap_or_default()
    }

    async fn set_state(&self, user: &UserId, state: OnboardingState) {
        let mut users = self.users.write().await;
        users.entry(user.clone()).or_default().state = state;
    }

    async fn stats(&self) -> StoreStats {
        let users = self.users.read().await;
        StoreStats {
            total_users: users.len(),
            profiled_users: users.values().filter(|record| record.profile.is_some()).count(),
            awaiting_description: users
                .values()
                .filter(|record| record.state == OnboardingState::AwaitingDescription)
                .count(),
        }
    }
}

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use pulse_db::{ProfileStore, StoreStats};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    store: Arc<dyn ProfileStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub profiles: StoreStats,
    pub checked_at: String,
}

pub fn router(store: Arc<dyn ProfileStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let profiles = state.store.stats().await;

    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "pulse-server runtime initialized".to_string(),
        },
        profiles,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use chrono::Utc;
    use pulse_core::domain::profile::{ExperienceLevel, Role, UserId, UserProfile};
    use pulse_core::flows::OnboardingState;
    use pulse_db::{InMemoryProfileStore, ProfileStore};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_reports_profile_store_counts() {
        let store = Arc::new(InMemoryProfileStore::new());
        store.set_state(&UserId::new("U1"), OnboardingState::AwaitingDescription).await;
        store
            .put(
                &UserId::new("U2"),
                UserProfile {
                    user_id: UserId::new("U2"),
                    role: Role::Design,
                    interests: Vec::new(),
                    experience: ExperienceLevel::Unspecified,
                    industry: None,
                    summary: None,
                    source_description: "designer".to_owned(),
                    created_at: Utc::now(),
                },
            )
            .await;

        let (status, Json(payload)) = health(State(HealthState { store })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.profiles.total_users, 2);
        assert_eq!(payload.profiles.profiled_users, 1);
        assert_eq!(payload.profiles.awaiting_description, 1);
    }

    #[tokio::test]
    async fn health_on_empty_store_is_ready() {
        let (status, Json(payload)) =
            health(State(HealthState { store: Arc::new(InMemoryProfileStore::new()) })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.profiles.total_users, 0);
        assert_eq!(payload.service.status, "ready");
    }
}

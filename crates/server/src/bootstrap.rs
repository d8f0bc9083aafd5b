use std::sync::Arc;

use axum::Router;
use pulse_agent::{conversation::ConversationHandler, llm::LlmError, runtime::AgentRuntime};
use pulse_core::catalog::StaticCatalog;
use pulse_core::config::{AppConfig, ConfigError};
use pulse_db::{InMemoryProfileStore, ProfileStore};
use pulse_slack::client::{SlackApiError, SlackPoster, SlackWebClient};
use thiserror::Error;
use tracing::info;

use crate::{health, routes};

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<dyn ProfileStore>,
    pub conversation: Arc<ConversationHandler>,
    pub poster: Arc<dyn SlackPoster>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("llm client setup failed: {0}")]
    Llm(#[source] LlmError),
    #[error("slack client setup failed: {0}")]
    Slack(#[source] SlackApiError),
}

impl Application {
    pub fn router(&self) -> Router {
        routes::router(routes::SlackState::new(self.conversation.clone(), self.poster.clone()))
            .merge(health::router(self.store.clone()))
    }
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let store: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
    let catalog = Arc::new(StaticCatalog::builtin());
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        articles = catalog.len(),
        "article catalog loaded"
    );

    let runtime = AgentRuntime::from_config(&config.llm).map_err(BootstrapError::Llm)?;
    let conversation =
        Arc::new(runtime.conversation_handler(store.clone(), &config.digest, catalog));
    let poster: Arc<dyn SlackPoster> =
        Arc::new(SlackWebClient::from_config(&config.slack).map_err(BootstrapError::Slack)?);

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        max_articles = config.digest.max_articles,
        ai_rationale = config.digest.ai_rationale,
        "application bootstrap complete"
    );

    Ok(Application { config, store, conversation, poster })
}

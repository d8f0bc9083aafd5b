use std::sync::Arc;

use pulse_core::catalog::ArticleSource;
use pulse_core::config::{DigestConfig, LlmConfig};
use pulse_core::curator::DigestCurator;
use pulse_db::ProfileStore;
use tracing::info;

use crate::conversation::ConversationHandler;
use crate::extractor::ProfileExtractor;
use crate::guardrails::GuardrailPolicy;
use crate::llm::{LlmClient, LlmError, OpenAiCompatibleClient};
use crate::rationale::LlmRationaleWriter;

/// Owns the model client and builds the conversation pipeline around it.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    guardrails: GuardrailPolicy,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, guardrails: GuardrailPolicy) -> Self {
        Self { llm, guardrails }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = OpenAiCompatibleClient::from_config(config)?;
        info!(
            event_name = "agent.llm_client.ready",
            provider = config.provider.as_str(),
            model = %config.model,
            endpoint = %client.completions_url(),
            "llm client ready"
        );
        Ok(Self::new(Arc::new(client), GuardrailPolicy::default()))
    }

    pub fn curator(&self, digest: &DigestConfig, source: Arc<dyn ArticleSource>) -> DigestCurator {
        let curator = DigestCurator::new(source, digest.max_articles);
        if digest.ai_rationale {
            curator.with_rationale_writer(Arc::new(LlmRationaleWriter::new(self.llm.clone())))
        } else {
            curator
        }
    }

    pub fn conversation_handler(
        &self,
        store: Arc<dyn ProfileStore>,
        digest: &DigestConfig,
        source: Arc<dyn ArticleSource>,
    ) -> ConversationHandler {
        ConversationHandler::new(
            store,
            ProfileExtractor::new(self.llm.clone()),
            Arc::new(self.curator(digest, source)),
            self.guardrails.clone(),
        )
    }
}
